use super::{AnalysisService, ByteStream, HandwritingService, InlineDocument, OutputPart};
use crate::error::UpstreamError;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};

/// One scripted item of a mock analysis stream.
#[derive(Debug, Clone)]
pub enum MockChunk {
    Data(Bytes),
    Fail(UpstreamError),
}

pub struct MockAnalysisClient {
    text_responses: Arc<Mutex<Vec<String>>>,
    stream_chunks: Arc<Mutex<Vec<MockChunk>>>,
    failure: Arc<Mutex<Option<UpstreamError>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockAnalysisClient {
    pub fn new() -> Self {
        Self {
            text_responses: Arc::new(Mutex::new(Vec::new())),
            stream_chunks: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_text_response(self, response: String) -> Self {
        self.text_responses.lock().unwrap().push(response);
        self
    }

    pub fn with_stream_chunk(self, chunk: impl Into<Bytes>) -> Self {
        self.stream_chunks
            .lock()
            .unwrap()
            .push(MockChunk::Data(chunk.into()));
        self
    }

    /// Ends the scripted stream with a transport failure.
    pub fn with_stream_failure(self, err: UpstreamError) -> Self {
        self.stream_chunks.lock().unwrap().push(MockChunk::Fail(err));
        self
    }

    /// Fails every call before any output is produced.
    pub fn with_failure(self, err: UpstreamError) -> Self {
        *self.failure.lock().unwrap() = Some(err);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    fn record_call(&self) -> Result<usize> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(Error::Upstream(err)),
            None => Ok(*count),
        }
    }
}

impl Default for MockAnalysisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisService for MockAnalysisClient {
    async fn analyze(&self, document: &InlineDocument, _model: &str) -> Result<String> {
        let count = self.record_call()?;

        let responses = self.text_responses.lock().unwrap();
        if responses.is_empty() {
            Ok(format!("Analysis of {} document", document.mime_type))
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }

    async fn analyze_stream(&self, _document: &InlineDocument, _model: &str) -> Result<ByteStream> {
        self.record_call()?;

        let items: Vec<Result<Bytes>> = self
            .stream_chunks
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(|chunk| match chunk {
                MockChunk::Data(bytes) => Ok(bytes),
                MockChunk::Fail(err) => Err(Error::Upstream(err)),
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

pub struct MockHandwritingClient {
    responses: Arc<Mutex<Vec<Vec<OutputPart>>>>,
    failure: Arc<Mutex<Option<UpstreamError>>>,
    call_count: Arc<Mutex<usize>>,
    last_prompt: Arc<Mutex<Option<String>>>,
}

impl MockHandwritingClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_parts(self, parts: Vec<OutputPart>) -> Self {
        self.responses.lock().unwrap().push(parts);
        self
    }

    pub fn with_failure(self, err: UpstreamError) -> Self {
        *self.failure.lock().unwrap() = Some(err);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

impl Default for MockHandwritingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HandwritingService for MockHandwritingClient {
    async fn synthesize(
        &self,
        _sample: &[u8],
        _mime_type: &str,
        prompt: &str,
    ) -> Result<Vec<OutputPart>> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(Error::Upstream(err));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Vec::new())
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}
