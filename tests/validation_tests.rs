//! Schema validation against a reduced NF-e 4.00 schema set

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use nfe_xsd::validators::ErrorKind;
use nfe_xsd::{Error, Limits, SchemaBundle, SchemaSources};
use pretty_assertions::assert_eq;

const PRIMARY: &str = "enviNFe_v4.00.xsd";

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn schema_dir() -> PathBuf {
    fixtures().join("schemas")
}

fn document(name: &str) -> String {
    fs::read_to_string(fixtures().join("documents").join(name)).unwrap()
}

fn bundle() -> SchemaBundle {
    SchemaBundle::from_file(schema_dir().join(PRIMARY), None, Limits::default()).unwrap()
}

#[test]
fn test_bundle_loads_every_referenced_document() {
    let bundle = bundle();
    assert_eq!(
        bundle.document_names().collect::<Vec<_>>(),
        vec![
            "enviNFe_v4.00.xsd",
            "leiauteNFe_v4.00.xsd",
            "tiposBasico_v4.00.xsd",
            "xmldsig-core-schema_v1.01.xsd",
        ]
    );
    assert_eq!(bundle.target_namespace(), Some("http://www.portalfiscal.inf.br/nfe"));
}

#[test]
fn test_valid_invoice() {
    let report = bundle().validate_str(&document("enviNFe_valid.xml")).unwrap();
    assert!(report.valid, "unexpected errors: {:#?}", report.errors);
    assert!(report.errors.is_empty());
}

#[test]
fn test_undeclared_ind_pag_is_rejected() {
    let report = bundle().validate_str(&document("enviNFe_indPag.xml")).unwrap();

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);

    let error = &report.errors[0];
    assert_eq!(error.kind, ErrorKind::UnexpectedElement);
    assert_eq!(
        error.message,
        "Element '{http://www.portalfiscal.inf.br/nfe}indPag': This element is not expected. \
         Expected is ( {http://www.portalfiscal.inf.br/nfe}tPag )."
    );
    assert_eq!(error.path, "/enviNFe/NFe/infNFe/pag/detPag/indPag");

    let line = document("enviNFe_indPag.xml")
        .lines()
        .position(|l| l.contains("<indPag>"))
        .unwrap() as u32
        + 1;
    assert_eq!(error.line, line);
}

#[test]
fn test_removing_ind_pag_makes_it_valid() {
    let fixed = document("enviNFe_indPag.xml").replace("<indPag>0</indPag>", "");
    assert!(bundle().is_valid_str(&fixed).unwrap());
}

#[test]
fn test_facet_violations_name_the_element() {
    let xml = document("enviNFe_valid.xml")
        .replace("<vProd>11.70</vProd>", "<vProd>11.7</vProd>")
        .replace("<UF>SP</UF>", "<UF>XX</UF>");
    let report = bundle().validate_str(&xml).unwrap();

    let kinds: Vec<ErrorKind> = report.errors.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ErrorKind::InvalidValue, ErrorKind::InvalidValue]);
    assert!(report.errors[0]
        .message
        .starts_with("Element '{http://www.portalfiscal.inf.br/nfe}UF': [facet 'enumeration']"));
    assert!(report.errors[1].message.contains("[facet 'pattern'] The value '11.7'"));
    assert_eq!(report.errors[1].path, "/enviNFe/NFe/infNFe/det/prod/vProd");
}

#[test]
fn test_missing_signature_and_attribute() {
    let original = document("enviNFe_valid.xml");
    let start = original.find("<Signature").unwrap();
    let end = original.find("</Signature>").unwrap() + "</Signature>".len();
    let mut xml = original.clone();
    xml.replace_range(start..end, "");
    let xml = xml.replace(r#"<det nItem="2">"#, "<det>");

    let report = bundle().validate_str(&xml).unwrap();
    let kinds: Vec<ErrorKind> = report.errors.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ErrorKind::MissingAttribute, ErrorKind::MissingElement]);
    assert_eq!(
        report.errors[1].message,
        "Element '{http://www.portalfiscal.inf.br/nfe}NFe': Missing child element(s). \
         Expected is ( {http://www.w3.org/2000/09/xmldsig#}Signature )."
    );
}

#[test]
fn test_unknown_root() {
    let report = bundle()
        .validate_str(r#"<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe"/>"#)
        .unwrap();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::UnknownRoot);
}

#[test]
fn test_mismatched_close_tag_fails_before_schema_logic() {
    let unbalanced = document("enviNFe_valid.xml").replacen("</ide>", "", 1);
    match bundle().validate_str(&unbalanced) {
        Err(Error::Parse(e)) => {
            assert_eq!(e.source_name.as_deref(), Some("document"));
            assert!(e.line.unwrap_or(0) > 17);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_missing_include_is_an_assembly_error() {
    let mut sources: HashMap<String, String> = HashMap::new();
    let primary = fs::read_to_string(schema_dir().join(PRIMARY)).unwrap();
    sources.insert(
        "leiauteNFe_v4.00.xsd".to_string(),
        fs::read_to_string(schema_dir().join("leiauteNFe_v4.00.xsd")).unwrap(),
    );

    match SchemaBundle::build(PRIMARY, &primary, &sources) {
        Err(Error::SchemaAssembly {
            reference,
            referenced_from,
        }) => {
            assert_eq!(reference, "tiposBasico_v4.00.xsd");
            assert_eq!(referenced_from, "leiauteNFe_v4.00.xsd");
        }
        other => panic!("expected an assembly error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_validation_is_idempotent() {
    let bundle = bundle();
    let xml = document("enviNFe_indPag.xml");
    let first = bundle.validate_str(&xml).unwrap();
    let second = bundle.validate_str(&xml).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_bundle_shared_across_threads() {
    let bundle = Arc::new(bundle());
    let documents = ["enviNFe_valid.xml", "enviNFe_indPag.xml"];

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let bundle = Arc::clone(&bundle);
            let xml = document(documents[i % 2]);
            thread::spawn(move || bundle.validate_str(&xml).unwrap().valid)
        })
        .collect();

    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![true, false, true, false]);
}

#[test]
fn test_sources_from_dir_use_basenames() {
    let sources = SchemaSources::from_dir(schema_dir(), &Limits::default()).unwrap();
    assert_eq!(sources.len(), 4);

    let primary = fs::read_to_string(Path::new(&schema_dir()).join(PRIMARY)).unwrap();
    let bundle =
        SchemaBundle::build("/srv/schemas/PL_009/enviNFe_v4.00.xsd", &primary, &sources).unwrap();
    assert_eq!(bundle.primary(), "enviNFe_v4.00.xsd");
}

#[test]
fn test_schema_document_limit() {
    let limits = Limits {
        max_schema_documents: 2,
        ..Limits::default()
    };
    let err = SchemaBundle::from_file(schema_dir().join(PRIMARY), None, limits).unwrap_err();
    assert!(matches!(err, Error::LimitExceeded(_)));
}

#[test]
fn test_report_serializes_to_json() {
    let report = bundle().validate_str(&document("enviNFe_indPag.xml")).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"][0]["kind"], "unexpected_element");
}
