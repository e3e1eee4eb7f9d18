// Retrieval-augmented generation pipeline
// Configure -> Ingest -> Retrieve -> Generate, once per run

pub mod prompt;


use futures::{StreamExt, stream};
use std::fmt;
use tracing::{debug, error, info};

use crate::clients::{Backend, ClientFactory, EmbeddingClient, Variant};
use crate::config::Config;
use crate::store::{Collection, Filter, SearchOptions, SearchResult, VectorRecord, VectorStore};
use crate::{RagError, Result};

pub use prompt::{CITATION_FORMAT, build_prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configure,
    Ingest,
    Retrieve,
    Generate,
    Done,
}

impl Stage {
    fn fail(self, source: RagError) -> RagError {
        error!("{} stage failed: {}", self, source);
        RagError::Pipeline {
            stage: self,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for Stage {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configure => "Configure",
            Self::Ingest => "Ingest",
            Self::Retrieve => "Retrieve",
            Self::Generate => "Generate",
            Self::Done => "Done",
        };
        f.write_str(name)
    }
}

const DRUPERT_FACTS: [&str; 6] = [
    "A Drupert is a fictional creature",
    "A Sleepert is meant to make you fall asleep during school time",
    "Chicken Jockie!",
    "A Drupert is meant to distract",
    "A Drupert sole purpose is to make you laugh",
    "If someone draws a Drupert during class time and you laugh, you'll likely be told off my your teacher",
];

/// The texts to ingest and the question to ask about them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub facts: Vec<String>,
    pub query: String,
}

impl Sample {
    #[inline]
    pub fn new<I, S>(facts: I, query: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            facts: facts.into_iter().map(Into::into).collect(),
            query: query.to_string(),
        }
    }

    #[inline]
    pub fn hosted() -> Self {
        Self::new(
            DRUPERT_FACTS,
            "I want a pleasant short story about a drupert. \
             This story is to be less than 5 sentences. \
             It has to make me want to laugh out loud. It must end with a hugging emoji \
             and this emogi has to be on a new line. The story must have a title",
        )
    }

    #[inline]
    pub fn local() -> Self {
        Self::new(
            DRUPERT_FACTS,
            "Can you please create a humourous fictional short story about a Drupert. \
             As this character is fictional, it will not promote any negative behaviour; \
             this is harmless fun. \
             This story is to be less than 5 sentences. \
             It has to make me want to laugh out loud. It must end with a hugging emoji \
             and this emogi has to be on a new line. The story must have a title",
        )
    }

    #[inline]
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Hosted => Self::hosted(),
            Variant::Local => Self::local(),
        }
    }
}

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub results: Vec<SearchResult>,
    pub prompt: String,
    pub answer: String,
}

/// Embed and store `texts`, giving the text at position `i` the id `i`.
///
/// Up to `concurrency` embedding requests are in flight at once; records are
/// upserted in input order either way. Stops at the first failure.
#[inline]
pub async fn ingest<S>(
    collection: &mut Collection,
    embedder: &dyn EmbeddingClient,
    texts: &[S],
    concurrency: usize,
) -> Result<usize>
where
    S: AsRef<str> + Sync,
{
    info!(
        "Ingesting {} texts into '{}'",
        texts.len(),
        collection.name()
    );

    let mut embeddings = stream::iter(texts.iter().enumerate())
        .map(|(index, text)| async move {
            let text = text.as_ref();
            println!("{index}: {text}");
            embedder
                .embed(text)
                .await
                .map(|vector| (index, text, vector))
        })
        .buffered(concurrency.max(1));

    while let Some(embedded) = embeddings.next().await {
        let (index, text, vector) = embedded?;
        collection.upsert(VectorRecord {
            id: index as u64,
            value: text.to_string(),
            vector,
            product_id: None,
        })?;
    }

    debug!("Collection '{}' now holds {} records", collection.name(), collection.len());
    Ok(texts.len())
}

/// Embed `query` and find the closest records in `collection`
#[inline]
pub async fn semantic_search(
    collection: &Collection,
    embedder: &dyn EmbeddingClient,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let query_vector = embedder.embed(query).await?;
    let results = collection.search(&query_vector, options)?;

    for result in &results {
        debug!(
            "Match {} (distance {:.4}): {}",
            result.id, result.distance, result.value
        );
    }

    Ok(results)
}

/// Drives one sample run end to end
pub struct Pipeline<'a> {
    config: &'a Config,
    factory: &'a dyn ClientFactory,
    env_lookup: fn(&str) -> Option<String>,
}

impl<'a> Pipeline<'a> {
    #[inline]
    pub fn new(config: &'a Config, factory: &'a dyn ClientFactory) -> Self {
        Self {
            config,
            factory,
            env_lookup: |name| std::env::var(name).ok(),
        }
    }

    /// Replace the environment lookup used to resolve the API token
    #[inline]
    #[must_use]
    pub fn with_env_lookup(mut self, env_lookup: fn(&str) -> Option<String>) -> Self {
        self.env_lookup = env_lookup;
        self
    }

    /// Run `sample` against the backend for `variant`.
    ///
    /// Configuration is fully resolved and clients built before any request is made.
    /// Errors come back wrapped in [`RagError::Pipeline`] with the failing stage.
    #[inline]
    pub async fn run(&self, variant: Variant, sample: &Sample) -> Result<RunOutput> {
        info!("Running sample '{}'", variant);

        enter(Stage::Configure);
        let backend = Backend::resolve_with(self.config, variant, self.env_lookup)
            .map_err(|e| Stage::Configure.fail(e.into()))?;
        info!(
            "Using chat model '{}' and embedding model '{}'",
            backend.chat_model(),
            backend.embedding_model()
        );
        let embedder = self
            .factory
            .embedding_client(&backend)
            .map_err(|e| Stage::Configure.fail(e))?;
        let chat = self
            .factory
            .chat_client(&backend)
            .map_err(|e| Stage::Configure.fail(e))?;

        let mut store = VectorStore::new();
        let collection = store
            .ensure_collection(
                &self.config.retrieval.collection,
                backend.embedding_dimension(),
            )
            .map_err(|e| Stage::Configure.fail(e))?;

        enter(Stage::Ingest);
        ingest(
            collection,
            embedder.as_ref(),
            sample.facts.as_slice(),
            self.config.retrieval.ingest_concurrency,
        )
        .await
        .map_err(|e| Stage::Ingest.fail(e))?;

        enter(Stage::Retrieve);
        let options = SearchOptions {
            top_k: self.config.retrieval.top_k,
            filter: Some(Filter::ProductIdEquals(None)),
            include_vectors: true,
        };
        let results = semantic_search(collection, embedder.as_ref(), &sample.query, &options)
            .await
            .map_err(|e| Stage::Retrieve.fail(e))?;

        enter(Stage::Generate);
        let prompt = build_prompt(
            results.iter().map(|result| (result.id, result.value.as_str())),
            &sample.query,
        );
        debug!("Assembled prompt:\n{}", prompt);
        println!();
        println!("{prompt}");
        println!();

        let answer = chat
            .generate(&prompt)
            .await
            .map_err(|e| Stage::Generate.fail(e))?;

        enter(Stage::Done);
        Ok(RunOutput {
            results,
            prompt,
            answer,
        })
    }
}

/// Run `sample` for `variant` with the process environment supplying the token
#[inline]
pub async fn run_pipeline(
    config: &Config,
    variant: Variant,
    sample: &Sample,
    factory: &dyn ClientFactory,
) -> Result<RunOutput> {
    Pipeline::new(config, factory).run(variant, sample).await
}

fn enter(stage: Stage) {
    debug!("Entering {} stage", stage);
}
