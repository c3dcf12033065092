use std::fmt;

/// Pipeline stage reported by the document service.
///
/// The token set is owned by the service, so unknown tokens are kept verbatim
/// in [`Status::Other`] and treated as ordinary progress labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Local placeholder before the first event arrives
    Init,

    // Upload pipeline
    Validating,
    Uploading,
    Uploaded,
    Processing,
    Extracting,
    Chunking,
    Embedding,
    Indexing,
    Saving,

    // Query pipeline
    ProcessingQuestion,
    RefiningQuestion,
    RetrievingChunks,
    ProcessingChunks,
    GeneratingAnswer,

    // Terminal
    Complete,
    Error,

    Other(String),
}

impl Status {
    pub fn from_token(token: &str) -> Self {
        match token {
            "init" => Status::Init,
            "validating" => Status::Validating,
            "uploading" => Status::Uploading,
            "uploaded" => Status::Uploaded,
            "processing" => Status::Processing,
            "extracting" => Status::Extracting,
            "chunking" => Status::Chunking,
            "embedding" => Status::Embedding,
            "indexing" => Status::Indexing,
            "saving" => Status::Saving,
            "processing_question" => Status::ProcessingQuestion,
            "refining_question" => Status::RefiningQuestion,
            "retrieving_chunks" => Status::RetrievingChunks,
            "processing_chunks" => Status::ProcessingChunks,
            "generating_answer" => Status::GeneratingAnswer,
            "complete" => Status::Complete,
            "error" => Status::Error,
            other => Status::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Init => "init",
            Status::Validating => "validating",
            Status::Uploading => "uploading",
            Status::Uploaded => "uploaded",
            Status::Processing => "processing",
            Status::Extracting => "extracting",
            Status::Chunking => "chunking",
            Status::Embedding => "embedding",
            Status::Indexing => "indexing",
            Status::Saving => "saving",
            Status::ProcessingQuestion => "processing_question",
            Status::RefiningQuestion => "refining_question",
            Status::RetrievingChunks => "retrieving_chunks",
            Status::ProcessingChunks => "processing_chunks",
            Status::GeneratingAnswer => "generating_answer",
            Status::Complete => "complete",
            Status::Error => "error",
            Status::Other(token) => token,
        }
    }

    /// Short human label for a stage, if the stage is known
    pub fn label(&self) -> Option<&'static str> {
        let label = match self {
            Status::Init => "Starting",
            Status::Validating => "Validating document",
            Status::Uploading => "Saving document",
            Status::Uploaded => "Document saved",
            Status::Processing => "Extracting text",
            Status::Extracting => "Reading pages",
            Status::Chunking => "Breaking text into chunks",
            Status::Embedding => "Generating embeddings",
            Status::Indexing => "Building search index",
            Status::Saving => "Saving index",
            Status::ProcessingQuestion => "Analyzing your question",
            Status::RefiningQuestion => "Optimizing search query",
            Status::RetrievingChunks => "Searching knowledge base",
            Status::ProcessingChunks => "Processing relevant content",
            Status::GeneratingAnswer => "Generating response",
            Status::Complete => "Done",
            Status::Error => "Failed",
            Status::Other(_) => return None,
        };
        Some(label)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Status {
    fn from(token: &str) -> Self {
        Status::from_token(token)
    }
}

/// One decoded frame of the event stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Progress {
        status: Status,
        message: String,
        /// Percentage in 0..=100
        progress: u8,
    },
    Complete {
        message: String,
        answer: Option<String>,
    },
    Error {
        message: String,
    },
    /// A `data:` frame whose payload could not be decoded
    Malformed {
        reason: String,
    },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, StreamEvent::Malformed { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Progress { .. } => "progress",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Malformed { .. } => "malformed",
        }
    }
}
