use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdf_rag::config::{Config, OllamaConfig, SourceConfig};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const PDF_ROUTE: &str = "/policy.pdf";
pub const EMBEDDING_MODEL: &str = "test-embed";
pub const GENERATION_MODEL: &str = "test-llm";

const TOPICS: [&str; 4] = ["gift", "travel", "privacy", "security"];

/// Build a small text PDF in memory, one string per page
pub fn sample_pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = pages
        .iter()
        .map(|text| {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("content should encode"),
            ));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            })
            .into()
        })
        .collect();

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("sample PDF should serialize");
    bytes
}

/// Ollama `/api/embed` stand-in: one dimension per topic word
pub struct TopicEmbeddings;

impl Respond for TopicEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("request body is JSON");
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .expect("input is an array")
            .iter()
            .map(|text| {
                let text = text.as_str().unwrap_or_default().to_lowercase();
                TOPICS
                    .iter()
                    .map(|topic| text.matches(topic).count() as f32)
                    .collect()
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

pub async fn mount_pdf(server: &MockServer, pdf: Vec<u8>, expected_requests: u64) {
    Mock::given(method("GET"))
        .and(path(PDF_ROUTE))
        .respond_with(ResponseTemplate::new(200).set_body_raw(pdf, "application/pdf"))
        .expect(expected_requests)
        .mount(server)
        .await;
}

pub async fn mount_ollama(server: &MockServer, answer: &str) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(TopicEmbeddings)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "model": GENERATION_MODEL, "response": answer, "done": true })),
        )
        .mount(server)
        .await;
}

/// Configuration rooted at `base_dir` that talks only to `server`
pub fn test_config(base_dir: &Path, server: &MockServer) -> Config {
    let address = server.address();
    let pdf_url = Url::parse(&server.uri())
        .and_then(|base| base.join(PDF_ROUTE))
        .expect("mock server URL is valid");

    Config {
        source: SourceConfig {
            url: pdf_url.to_string(),
            ..SourceConfig::default()
        },
        ollama: OllamaConfig {
            protocol: "http".to_string(),
            host: address.ip().to_string(),
            port: address.port(),
            embedding_model: EMBEDDING_MODEL.to_string(),
            generation_model: GENERATION_MODEL.to_string(),
            ..OllamaConfig::default()
        },
        base_dir: base_dir.to_path_buf(),
        ..Config::default()
    }
}
