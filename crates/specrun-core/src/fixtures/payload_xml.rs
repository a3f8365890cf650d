//! `Payload_Xml_*`: XML model round trips (GET returns the model, PUT sends it)

use std::collections::BTreeMap;

use crate::scenario::{
    Body, CONTENT_TYPE_XML, HttpVerb, MockMethod, RequestCheck, RequestSpec, ResponseSpec,
    Scenario,
};

const SIMPLE_MODEL: &str = "
<SimpleModel>
  <name>foo</name>
  <age>123</age>
</SimpleModel>
";

const MODEL_WITH_SIMPLE_ARRAYS: &str = "
<ModelWithSimpleArrays>
  <colors>
    <string>red</string>
    <string>green</string>
    <string>blue</string>
  </colors>
  <counts>
    <int32>1</int32>
    <int32>2</int32>
  </counts>
</ModelWithSimpleArrays>
";

const MODEL_WITH_ARRAY_OF_MODEL: &str = "
<ModelWithArrayOfModel>
  <items>
    <SimpleModel>
      <name>foo</name>
      <age>123</age>
    </SimpleModel>
    <SimpleModel>
      <name>bar</name>
      <age>456</age>
    </SimpleModel>
  </items>
</ModelWithArrayOfModel>
";

const MODEL_WITH_OPTIONAL_FIELD: &str = "
<ModelWithOptionalField>
  <item>widget</item>
</ModelWithOptionalField>
";

const MODEL_WITH_ATTRIBUTES: &str = r#"
<ModelWithAttributes id1="123" id2="foo">
  <enabled>true</enabled>
</ModelWithAttributes>
"#;

const MODEL_WITH_UNWRAPPED_ARRAY: &str = "
<ModelWithUnwrappedArray>
  <colors>red</colors>
  <colors>green</colors>
  <colors>blue</colors>
  <counts>
    <int32>1</int32>
    <int32>2</int32>
  </counts>
</ModelWithUnwrappedArray>
";

const MODEL_WITH_RENAMED_ARRAYS: &str = "
<ModelWithRenamedArrays>
  <Colors>red</Colors>
  <Colors>green</Colors>
  <Colors>blue</Colors>
  <Counts>
    <int32>1</int32>
    <int32>2</int32>
  </Counts>
</ModelWithRenamedArrays>
";

const MODEL_WITH_RENAMED_FIELDS: &str = "
<ModelWithRenamedFieldsSrc>
  <InputData>
    <name>foo</name>
    <age>123</age>
  </InputData>
  <OutputData>
    <name>bar</name>
    <age>456</age>
  </OutputData>
</ModelWithRenamedFieldsSrc>
";

const MODEL_WITH_EMPTY_ARRAY: &str = "
<ModelWithEmptyArray>
  <items />
</ModelWithEmptyArray>
";

const MODEL_WITH_TEXT: &str = r#"
<ModelWithText language="foo">
  This is some text.
</ModelWithText>
"#;

const MODEL_WITH_DICTIONARY: &str = "
<ModelWithDictionary>
  <metadata>
    <Color>blue</Color>
    <Count>123</Count>
    <Enabled>false</Enabled>
  </metadata>
</ModelWithDictionary>
";

const MODEL_WITH_ENCODED_NAMES: &str = "
<ModelWithEncodedNamesSrc>
  <SimpleModelData>
    <name>foo</name>
    <age>123</age>
  </SimpleModelData>
  <PossibleColors>
    <string>red</string>
    <string>green</string>
    <string>blue</string>
  </PossibleColors>
</ModelWithEncodedNamesSrc>
";

/// `(scenario suffix, uri segment, document)`
const MODELS: &[(&str, &str, &str)] = &[
    ("SimpleModel", "simpleModel", SIMPLE_MODEL),
    ("ModelWithSimpleArrays", "modelWithSimpleArrays", MODEL_WITH_SIMPLE_ARRAYS),
    ("ModelWithArrayOfModel", "modelWithArrayOfModel", MODEL_WITH_ARRAY_OF_MODEL),
    ("ModelWithOptionalField", "modelWithOptionalField", MODEL_WITH_OPTIONAL_FIELD),
    ("ModelWithAttributes", "modelWithAttributes", MODEL_WITH_ATTRIBUTES),
    ("ModelWithUnwrappedArray", "modelWithUnwrappedArray", MODEL_WITH_UNWRAPPED_ARRAY),
    ("ModelWithRenamedArrays", "modelWithRenamedArrays", MODEL_WITH_RENAMED_ARRAYS),
    ("ModelWithRenamedFields", "modelWithRenamedFields", MODEL_WITH_RENAMED_FIELDS),
    ("ModelWithEmptyArray", "modelWithEmptyArray", MODEL_WITH_EMPTY_ARRAY),
    ("ModelWithText", "modelWithText", MODEL_WITH_TEXT),
    ("ModelWithDictionary", "modelWithDictionary", MODEL_WITH_DICTIONARY),
    ("ModelWithEncodedNames", "modelWithEncodedNames", MODEL_WITH_ENCODED_NAMES),
];

pub(super) fn scenarios() -> Vec<Scenario> {
    MODELS
        .iter()
        .map(|(suffix, segment, document)| {
            Scenario::new(
                format!("Payload_Xml_{suffix}"),
                format!("/payload/xml/{segment}"),
                vec![get_model(document), put_model(document)],
            )
        })
        .collect()
}

fn get_model(document: &str) -> MockMethod {
    MockMethod::new(
        HttpVerb::Get,
        RequestSpec::default(),
        ResponseSpec::status(200).with_body(Body::xml(document)),
    )
}

fn put_model(document: &str) -> MockMethod {
    let request = RequestSpec {
        headers: Some(BTreeMap::from([(
            "content-type".to_string(),
            CONTENT_TYPE_XML.to_string(),
        )])),
        body: Some(Body::xml(document)),
        ..Default::default()
    };
    MockMethod::new(HttpVerb::Put, request, ResponseSpec::status(204))
        .with_check(RequestCheck::Header {
            name: "content-type".into(),
            value: CONTENT_TYPE_XML.into(),
        })
        .with_check(RequestCheck::XmlBody {
            value: document.into(),
        })
}
