//! Shared fixtures for integration tests
//!
//! Scripted backends and an in-memory object store stand in for the hosted
//! models and S3, so no test leaves the process.

#![allow(dead_code)]

use async_trait::async_trait;
use chatrelay::{
    config::Config,
    knowledge::{KnowledgeBase, KnowledgeEntry, SupportInfo, loader::parse_json},
    metrics::Metrics,
    models::{
        BackendError, ChatTurn, CredentialProfile, CredentialRotator, ImageBackend, TextBackend,
        reply::BackendReply,
    },
    responders::{ImagePipeline, TextResponder},
    router::MessageRouter,
    shared::RetryExecutor,
    storage::{ObjectStore, StorageError},
};
use std::collections::VecDeque;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SAMPLE_KNOWLEDGE_BASE: &str = include_str!("../../data/questions_and_answers.json");

pub fn support() -> SupportInfo {
    SupportInfo::new("+355676038187", "support@baboon.al")
}

pub fn sample_knowledge_base() -> KnowledgeBase {
    let entries = parse_json(SAMPLE_KNOWLEDGE_BASE.as_bytes()).expect("sample should parse");
    KnowledgeBase::new(entries, support())
}

pub fn small_knowledge_base() -> KnowledgeBase {
    KnowledgeBase::new(
        vec![
            KnowledgeEntry::new(
                "How do I track my order?",
                "Use the tracking page in the app.",
            ),
            KnowledgeEntry::new(
                "What is your return policy?",
                "Returns are accepted within 30 days.",
            ),
        ],
        support(),
    )
}

pub fn profiles(n: usize) -> Vec<CredentialProfile> {
    (1..=n)
        .map(|i| {
            CredentialProfile::new(
                format!("project-{}", i),
                "us-central1",
                format!("/run/secrets/key-{}", i),
            )
        })
        .collect()
}

pub fn rotator(n: usize) -> Arc<CredentialRotator> {
    Arc::new(CredentialRotator::new(profiles(n)).expect("non-empty profiles"))
}

/// One-second base delay, no jitter, for paused-clock tests
pub fn retry(max_attempts: u32) -> RetryExecutor {
    RetryExecutor::new(
        max_attempts,
        Duration::from_secs(1),
        Duration::from_secs(60),
        false,
    )
    .expect("valid retry settings")
}

pub fn metrics() -> Arc<Metrics> {
    Arc::new(Metrics::new().expect("metrics registry"))
}

pub fn status_error(status: u16) -> BackendError {
    BackendError::Status {
        endpoint: "mock".to_string(),
        status,
        body: "scripted failure".to_string(),
    }
}

/// PNG of the given size filled with one colour
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("png encode");
    out.into_inner()
}

/// Text backend answering from a script, then with `fallback`
pub struct ScriptedTextBackend {
    script: Mutex<VecDeque<Result<BackendReply, BackendError>>>,
    fallback: String,
    calls: Mutex<Vec<(String, Vec<ChatTurn>)>>,
}

impl ScriptedTextBackend {
    pub fn new(script: Vec<Result<BackendReply, BackendError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: "scripted reply".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self {
            fallback: reply.to_string(),
            ..Self::new(Vec::new())
        }
    }

    /// Project ids used, in call order
    pub fn projects(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn conversations(&self) -> Vec<Vec<ChatTurn>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }
}

#[async_trait]
impl TextBackend for ScriptedTextBackend {
    async fn generate_text(
        &self,
        profile: &CredentialProfile,
        conversation: &[ChatTurn],
    ) -> Result<BackendReply, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((profile.project_id().to_string(), conversation.to_vec()));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(BackendReply::Text(self.fallback.clone())))
    }
}

/// Image backend answering from a script, then with a small PNG
pub struct ScriptedImageBackend {
    script: Mutex<VecDeque<Result<Vec<u8>, BackendError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedImageBackend {
    pub fn new(script: Vec<Result<Vec<u8>, BackendError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn projects(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl ImageBackend for ScriptedImageBackend {
    async fn generate_image(
        &self,
        profile: &CredentialProfile,
        prompt: &str,
    ) -> Result<Vec<u8>, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((profile.project_id().to_string(), prompt.to_string()));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(png_bytes(64, 48)))
    }
}

/// Object store keeping uploads in memory, or refusing every put
pub struct MemoryObjectStore {
    fail: bool,
    objects: Mutex<Vec<(String, Vec<u8>, String)>>,
}

impl MemoryObjectStore {
    pub fn working() -> Self {
        Self {
            fail: false,
            objects: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            objects: Mutex::new(Vec::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _, _)| k.clone())
            .collect()
    }

    pub fn content_types(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, c)| c.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::Upload {
                bucket: "test-bucket".to_string(),
                key: key.to_string(),
                reason: "access denied".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), bytes, content_type.to_string()));
        Ok(format!("https://test-bucket.s3.eu-north-1.amazonaws.com/{}", key))
    }
}

/// Wiring of a router over scripted components
pub struct RouterFixture {
    pub router: Arc<MessageRouter>,
    pub text: Arc<ScriptedTextBackend>,
    pub images: Arc<ScriptedImageBackend>,
    pub store: Arc<MemoryObjectStore>,
    pub rotator: Arc<CredentialRotator>,
    pub metrics: Arc<Metrics>,
}

impl RouterFixture {
    pub fn new(
        knowledge: KnowledgeBase,
        text: ScriptedTextBackend,
        images: ScriptedImageBackend,
        store: MemoryObjectStore,
    ) -> Self {
        let text = Arc::new(text);
        let images = Arc::new(images);
        let store = Arc::new(store);
        let rotator = rotator(2);
        let metrics = metrics();

        let pipeline = Arc::new(ImagePipeline::new(
            images.clone(),
            store.clone(),
            rotator.clone(),
            retry(3),
            metrics.clone(),
        ));
        let responder = Arc::new(TextResponder::new(
            text.clone(),
            rotator.clone(),
            retry(3),
            metrics.clone(),
        ));
        let router = Arc::new(MessageRouter::new(
            Arc::new(knowledge),
            pipeline,
            responder,
            metrics.clone(),
        ));

        Self {
            router,
            text,
            images,
            store,
            rotator,
            metrics,
        }
    }
}

/// Minimal valid configuration
pub fn test_config() -> Config {
    Config::from_str(
        r#"
[server]
host = "127.0.0.1"
port = 8000

[[credentials]]
project_id = "project-1"
location = "us-central1"
key_path = "/run/secrets/key-1"

[[credentials]]
project_id = "project-2"
location = "us-central1"
key_path = "/run/secrets/key-2"

[session]
expiry_seconds = 3600
"#,
    )
    .expect("test config should parse")
}
