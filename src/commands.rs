//! CLI Command Handlers
//!
//! Each handler takes CLI args, a [`Context`] and Output, returns ExitCode.
//! Catalog-backed handlers are generic so they can run against any catalog.

use serde::Serialize;
use std::sync::Arc;

use crate::aggregate::Aggregator;
use crate::api::{Catalog, TmdbClient};
use crate::cli::{
    BackendCmd, BackendResponse, ExitCode, HistoryCmd, ListsCmd, Output, PlayCmd, PlayResponse,
    PlayTarget, ResolveCmd, ResolveResponse, SearchCmd, SessionStatus, UnlockCmd,
};
use crate::config::Config;
use crate::models::{validate_external_id, MovieSummary, Playback};
use crate::resolver::{self, ResolveError};
use crate::session::{now_millis, GateError, SessionGate};
use crate::store::{FileStore, MemoryStore, Preferences, Store};

// =============================================================================
// Context
// =============================================================================

/// Config plus the persisted store shared by all handlers
pub struct Context {
    pub config: Config,
    pub store: Box<dyn Store>,
    pub prefs: Preferences,
}

impl Context {
    /// Open the default store file (in-memory if no data dir exists)
    pub fn open(config: Config) -> Self {
        let store: Box<dyn Store> = match FileStore::default_path() {
            Some(path) => Box::new(FileStore::open(path)),
            None => {
                tracing::warn!("No data directory, session will not persist");
                Box::new(MemoryStore::new())
            }
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Box<dyn Store>) -> Self {
        let prefs = Preferences::new(config.history_enabled());
        Self {
            config,
            store,
            prefs,
        }
    }

    /// Session gate as persisted right now; expired tokens are purged
    pub fn gate(&mut self) -> SessionGate {
        SessionGate::load(self.store.as_mut(), self.config.pin(), now_millis())
    }

    pub fn is_unlocked(&mut self) -> bool {
        self.gate().is_unlocked()
    }

    /// Catalog client from the configured key and timeout
    pub fn client(&self) -> anyhow::Result<TmdbClient> {
        let key = self.config.tmdb_api_key()?;
        Ok(TmdbClient::new(key).with_timeout(self.config.request_timeout()))
    }
}

fn print<T: Serialize>(output: &Output, data: T) -> ExitCode {
    match output.print(data) {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

// =============================================================================
// Session Commands
// =============================================================================

pub fn unlock_cmd(cmd: UnlockCmd, ctx: &mut Context, output: &Output) -> ExitCode {
    let mut gate = ctx.gate();
    match gate.unlock(ctx.store.as_mut(), cmd.pin.trim(), now_millis()) {
        Ok(()) => {
            output.info("Session unlocked");
            print(output, SessionStatus { unlocked: true })
        }
        Err(e @ GateError::IncorrectPin) => output.error(e.to_string(), ExitCode::Locked),
        Err(e) => output.error(e.to_string(), ExitCode::Error),
    }
}

pub fn lock_cmd(ctx: &mut Context, output: &Output) -> ExitCode {
    let mut gate = ctx.gate();
    if let Err(e) = gate.lock(ctx.store.as_mut()) {
        return output.error(format!("Failed to end session: {}", e), ExitCode::Error);
    }
    output.info("Session locked");
    print(output, SessionStatus { unlocked: false })
}

// =============================================================================
// Lists Command
// =============================================================================

#[derive(Serialize)]
struct ListOutput<'a> {
    key: &'a str,
    title: &'a str,
    movies: &'a [MovieSummary],
}

pub async fn lists_cmd<C: Catalog + Sync>(
    cmd: ListsCmd,
    catalog: Arc<C>,
    ctx: &Context,
    output: &Output,
) -> ExitCode {
    let mut queries = ctx.config.queries();
    if let Some(key) = &cmd.key {
        queries.retain(|q| &q.key == key);
        if queries.is_empty() {
            return output.error(format!("Unknown list: {}", key), ExitCode::InvalidArgs);
        }
    }

    output.info(format!("Fetching {} lists...", queries.len()));
    let aggregator = Aggregator::new(catalog, queries);

    match aggregator.run().await {
        Ok(result) => {
            let lists: Vec<ListOutput> = aggregator
                .queries()
                .iter()
                .filter_map(|q| {
                    let movies = result.get(&q.key)?;
                    let len = cmd.limit.unwrap_or(movies.len()).min(movies.len());
                    Some(ListOutput {
                        key: &q.key,
                        title: &q.title,
                        movies: &movies[..len],
                    })
                })
                .collect();
            print(output, &lists)
        }
        Err(e) => {
            tracing::error!(error = %e, "List aggregation failed");
            output.error(e.user_message(), ExitCode::NetworkError)
        }
    }
}

// =============================================================================
// Search Command
// =============================================================================

pub async fn search_cmd<C: Catalog>(cmd: SearchCmd, catalog: &C, output: &Output) -> ExitCode {
    output.info(format!("Searching for: {}", cmd.query));

    match catalog.search(cmd.query.trim(), 1).await {
        Ok(page) => {
            let mut seen = std::collections::HashSet::new();
            let results: Vec<MovieSummary> = page
                .results
                .into_iter()
                .filter(|m| seen.insert(m.id))
                .take(cmd.limit)
                .collect();
            print(output, &results)
        }
        Err(e) => output.error(format!("Search failed: {}", e), ExitCode::NetworkError),
    }
}

// =============================================================================
// Resolve & Play Commands
// =============================================================================

fn resolve_error(e: ResolveError, output: &Output) -> ExitCode {
    match e {
        ResolveError::NotFound { .. } => output.error(e.notice(), ExitCode::NotFound),
        ResolveError::Transient { .. } => output.error(e.notice(), ExitCode::NetworkError),
    }
}

pub async fn resolve_cmd<C: Catalog>(cmd: ResolveCmd, catalog: &C, output: &Output) -> ExitCode {
    output.info(format!("Resolving: {}", cmd.tmdb_id));

    match resolver::resolve_id(catalog, cmd.tmdb_id).await {
        Ok(resolved) => print(
            output,
            ResolveResponse {
                tmdb_id: cmd.tmdb_id,
                title: resolved.title,
                imdb_id: resolved.external_id,
            },
        ),
        Err(e) => resolve_error(e, output),
    }
}

/// Resolve the target, build the URL, persist the selection and open it
pub async fn play_cmd<C: Catalog>(
    cmd: PlayCmd,
    catalog: &C,
    ctx: &mut Context,
    output: &Output,
) -> ExitCode {
    let (external_id, title) = match cmd.target() {
        PlayTarget::External(id) => match validate_external_id(&id) {
            Ok(_) => (id, None),
            Err(msg) => return output.error(msg, ExitCode::InvalidArgs),
        },
        PlayTarget::Catalog(tmdb_id) => match resolver::resolve_id(catalog, tmdb_id).await {
            Ok(resolved) => (resolved.external_id, Some(resolved.title)),
            Err(e) => return resolve_error(e, output),
        },
    };

    let backend = cmd
        .backend
        .or_else(|| ctx.prefs.backend(ctx.store.as_ref()))
        .unwrap_or_else(|| ctx.config.default_backend());

    if let Err(e) = ctx.prefs.record_played(ctx.store.as_mut(), &external_id) {
        tracing::warn!(error = %e, "Failed to persist selection");
    }

    let mut playback = Playback::new(external_id, backend);
    if let Some(title) = title {
        playback = playback.with_title(title);
    }
    let url = playback.url();

    let opened = if cmd.no_open {
        false
    } else {
        output.info(format!("Opening {} on {}...", playback.external_id, backend));
        match open::that(&url) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to open browser");
                false
            }
        }
    };

    print(
        output,
        PlayResponse {
            imdb_id: playback.external_id,
            title: playback.title,
            backend,
            url,
            opened,
        },
    )
}

// =============================================================================
// Preference Commands
// =============================================================================

pub fn backend_cmd(cmd: BackendCmd, ctx: &mut Context, output: &Output) -> ExitCode {
    let backend = match cmd.backend {
        Some(backend) => {
            if let Err(e) = ctx.prefs.set_backend(ctx.store.as_mut(), backend) {
                return output.error(format!("Failed to save backend: {}", e), ExitCode::Error);
            }
            backend
        }
        None => ctx
            .prefs
            .backend(ctx.store.as_ref())
            .unwrap_or_else(|| ctx.config.default_backend()),
    };

    print(
        output,
        BackendResponse {
            backend,
            name: backend.display_name().to_string(),
        },
    )
}

pub fn history_cmd(cmd: HistoryCmd, ctx: &mut Context, output: &Output) -> ExitCode {
    if cmd.clear {
        if let Err(e) = ctx.prefs.clear_history(ctx.store.as_mut()) {
            return output.error(format!("Failed to clear history: {}", e), ExitCode::Error);
        }
        output.info("History cleared");
    }
    let history = ctx.prefs.history(ctx.store.as_ref());
    print(output, history.entries())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KEY_BACKEND, KEY_SESSION};

    fn quiet() -> Output {
        Output {
            json: false,
            quiet: true,
        }
    }

    fn context() -> Context {
        Context::with_store(Config::default(), Box::new(MemoryStore::new()))
    }

    #[test]
    fn test_unlock_and_lock() {
        let mut ctx = context();
        let output = quiet();

        let code = unlock_cmd(
            UnlockCmd {
                pin: "000000".to_string(),
            },
            &mut ctx,
            &output,
        );
        assert_eq!(code, ExitCode::Locked);
        assert!(!ctx.is_unlocked());

        let pin = ctx.config.pin().to_string();
        assert_eq!(unlock_cmd(UnlockCmd { pin }, &mut ctx, &output), ExitCode::Success);
        assert!(ctx.is_unlocked());
        assert!(ctx.store.get(KEY_SESSION).is_some());

        assert_eq!(lock_cmd(&mut ctx, &output), ExitCode::Success);
        assert!(!ctx.is_unlocked());
    }

    #[test]
    fn test_backend_cmd_persists() {
        let mut ctx = context();
        let code = backend_cmd(
            BackendCmd {
                backend: Some(crate::models::Backend::TwoEmbed),
            },
            &mut ctx,
            &quiet(),
        );
        assert_eq!(code, ExitCode::Success);
        assert_eq!(ctx.store.get(KEY_BACKEND).as_deref(), Some("2embed"));
    }
}
