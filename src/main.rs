use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use encore::backend::auth::AuthClient;
use encore::backend::realtime::RealtimeSocket;
use encore::backend::rest::RestClient;
use encore::backend::{AccessToken, Page};
use encore::config::{BackendConfig, ConfigError};
use encore::data::{DataError, NewPost, follows, posts};
use encore::error::{BackendError, ErrorCode};
use encore::guard::{Guarded, RouteGuard};
use encore::inbox::UnreadCount;
use encore::nav::{Location, MemoryHistory};
use encore::redirect::{CanonicalRedirect, navigator_identity, resolve};
use encore::session::{SessionStore, UserIdentity, run_identity_sync};
use encore::store::MemoryStore;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing credentials; pass --email/--password or set ENCORE_EMAIL/ENCORE_PASSWORD")]
    MissingCredentials,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "E_CREDENTIALS",
            Self::Config(e) => e.error_code(),
            Self::Backend(e) => e.error_code(),
            Self::Data(e) => e.error_code(),
            Self::Json(_) => "E_JSON",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.retryable(),
            Self::Data(e) => e.retryable(),
            _ => false,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "encore", about = "encore client core: sessions, feed, redirects and live inbox")]
struct Cli {
    /// Overrides `ENCORE_BACKEND_URL` from the environment or `.env`.
    #[arg(long, env = "ENCORE_BACKEND_URL")]
    backend_url: Option<String>,

    #[arg(long, env = "ENCORE_ANON_KEY", hide_env_values = true)]
    anon_key: Option<String>,

    #[command(flatten)]
    credentials: Credentials,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct Credentials {
    #[arg(long, env = "ENCORE_EMAIL", global = true)]
    email: Option<String>,

    #[arg(long, env = "ENCORE_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print the user id.
    Login,
    /// Newest posts from the accounts the signed-in user follows.
    Feed {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = Page::DEFAULT_LIMIT)]
        limit: u32,
        /// Keep reading consecutive pages, stopping early at a short page.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Publish a post as the signed-in user.
    Post {
        content: String,
        #[arg(long)]
        media_url: Option<String>,
    },
    DeletePost {
        post_id: String,
    },
    /// Print where a legacy `/profile/{id}` URL redirects.
    Resolve {
        path: String,
    },
    /// Follow the live unread count for the signed-in user until Ctrl-C.
    WatchInbox,
}

struct Backend {
    auth: Arc<AuthClient>,
    rest: Arc<RestClient>,
    realtime: Arc<RealtimeSocket>,
}

impl Backend {
    fn connect(config: &BackendConfig) -> Result<Self, CliError> {
        let token = AccessToken::default();
        Ok(Self {
            auth: Arc::new(AuthClient::new(config, token.clone())?),
            rest: Arc::new(RestClient::new(config, token.clone())?),
            realtime: Arc::new(RealtimeSocket::new(config, token)),
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserIdentity, CliError> {
        let (Some(email), Some(password)) = (&credentials.email, &credentials.password) else {
            return Err(CliError::MissingCredentials);
        };
        Ok(self.auth.sign_in_with_password(email, password).await?)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!(code = e.error_code(), retryable = e.retryable(), error = %e, "command failed");
    }
    result
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = BackendConfig::from_lookup(|key| match key {
        "ENCORE_BACKEND_URL" => cli.backend_url.clone(),
        "ENCORE_ANON_KEY" => cli.anon_key.clone(),
        other => std::env::var(other).ok(),
    })?;
    let backend = Backend::connect(&config)?;

    match cli.command {
        Command::Login => {
            let user = backend.sign_in(&cli.credentials).await?;
            print_json(&serde_json::json!({ "id": user.id, "email": user.email }))
        }
        Command::Feed { offset, limit, pages } => {
            let user = backend.sign_in(&cli.credentials).await?;
            let following = follows::fetch_following_ids(&*backend.rest, &user.id).await?;
            let mut page = Page::new(offset, limit);
            let mut feed = Vec::new();
            for _ in 0..pages.max(1) {
                let batch = posts::fetch_posts_by_user_ids(&*backend.rest, &following, page).await?;
                let short = batch.len() < page.limit as usize;
                feed.extend(batch);
                if short {
                    break;
                }
                page = page.next();
            }
            print_json(&feed)
        }
        Command::Post { content, media_url } => {
            let user = backend.sign_in(&cli.credentials).await?;
            let post = posts::create_post(&*backend.rest, &NewPost { user_id: user.id, content, media_url }).await?;
            print_json(&post)
        }
        Command::DeletePost { post_id } => {
            backend.sign_in(&cli.credentials).await?;
            posts::delete_post(&*backend.rest, &post_id).await?;
            print_json(&serde_json::json!({ "deleted": post_id }))
        }
        Command::Resolve { path } => run_resolve(&backend, &path).await,
        Command::WatchInbox => run_watch_inbox(&backend, &cli.credentials).await,
    }
}

async fn run_resolve(backend: &Backend, path: &str) -> Result<(), CliError> {
    let location = Location::parse(path);
    let history = Arc::new(MemoryHistory::starting_at(path));
    let id = encore::redirect::legacy_user_id(&location.path).unwrap_or_default().to_owned();

    let mut resolver = CanonicalRedirect::new();
    let target = match resolver.begin(&id, &location, navigator_identity(&history)) {
        Some(pending) => resolve(pending, &*backend.rest, &*history).await,
        None => None,
    };
    print_json(&serde_json::json!({ "from": path, "to": target }))
}

async fn run_watch_inbox(backend: &Backend, credentials: &Credentials) -> Result<(), CliError> {
    backend.sign_in(credentials).await?;

    let store = SessionStore::new();
    let history = Arc::new(MemoryHistory::starting_at("/inbox"));
    let redirect_store = MemoryStore::new();
    let mut guard = RouteGuard::new(history.clone(), &redirect_store);
    let hook = UnreadCount::new(backend.rest.clone(), backend.realtime.clone());
    let mut counts = hook.watch();

    let log_counts = async {
        while counts.changed().await.is_ok() {
            let unread = *counts.borrow_and_update();
            tracing::info!(unread, "unread messages");
        }
    };
    let guarded_view = guard.watch(
        store.handle(),
        Location::parse("/inbox"),
        || "inbox",
        |rendered: Guarded<&str>| match rendered {
            Guarded::Loading => tracing::info!("session loading"),
            Guarded::Content(view) => tracing::info!(view, "rendering protected view"),
            Guarded::Redirecting => tracing::warn!("signed out; redirected to login"),
        },
    );

    tokio::select! {
        () = run_identity_sync(&store, &*backend.auth) => {}
        () = guarded_view => {}
        () = hook.follow_session(store.handle()) => {}
        () = log_counts => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }
    hook.teardown();
    if let Err(e) = backend.auth.sign_out().await {
        tracing::debug!(error = %e, "sign-out after watch failed");
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
