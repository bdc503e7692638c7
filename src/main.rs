//! gitea-reconcile - Gitea/Keycloak reconciliation CLI
//!
//! Main entry point. Prints one JSON result per reconciled resource on
//! stdout and exits non-zero when any of them failed.

use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand};
use gitea_reconcile::auth::Credentials;
use gitea_reconcile::bootstrap::{self, BootstrapSettings};
use gitea_reconcile::config::{validate_file_result, ConnectionConfig, ReconcileFile};
use gitea_reconcile::gitea::{Organization, RepoOwner, Repository};
use gitea_reconcile::keycloak;
use gitea_reconcile::reconcile::Resource;
use gitea_reconcile::retry::RetryConfig;
use gitea_reconcile::{Outcome, ReconcileError, Reconciler, TargetState};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

/// Reconcile Gitea organizations and repositories, bootstrap the VCS user
#[derive(Parser, Debug)]
#[command(name = "gitea-reconcile")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, update or delete an organization
    Org {
        /// Name of the organization
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        username: String,

        /// Description of the organization
        #[arg(long)]
        description: Option<String>,

        /// Full display name of the organization
        #[arg(long)]
        full_name: Option<String>,

        /// Location of the organization
        #[arg(long)]
        location: Option<String>,

        /// Website URL of the organization
        #[arg(long)]
        website: Option<String>,

        #[command(flatten)]
        gitea: GiteaArgs,
    },

    /// Create or delete a repository
    Repo {
        /// Name of the repository
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        name: String,

        /// Organization which owns/will own the repository
        #[arg(long)]
        org: Option<String>,

        /// User which owns/will own the repository
        #[arg(long)]
        user: Option<String>,

        /// Description of the repository to create
        #[arg(long)]
        description: Option<String>,

        /// Auto-initialize the repository when it is created
        #[arg(long)]
        auto_init: bool,

        /// Gitignores to use
        #[arg(long)]
        gitignores: Option<String>,

        /// License to use
        #[arg(long)]
        license: Option<String>,

        /// Make the repository private
        #[arg(long)]
        private: bool,

        /// Readme of the repository to create
        #[arg(long)]
        readme: Option<String>,

        #[command(flatten)]
        gitea: GiteaArgs,
    },

    /// Reconcile every organization and repository in a YAML file
    Apply {
        /// Path to the reconcile file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Make sure the VCS user exists in Keycloak, retrying until it does
    KeycloakBootstrap {
        /// Keycloak base URL
        #[arg(long, env = "KEYCLOAK_BASE", default_value = keycloak::DEFAULT_KEYCLOAK_BASE)]
        keycloak_base: String,

        /// Realm the VCS user is created in
        #[arg(long, default_value = keycloak::DEFAULT_USER_REALM)]
        realm: String,

        /// Directory holding the master admin client-id, user and password
        #[arg(long, default_value = keycloak::secrets::DEFAULT_ADMIN_SECRET_DIR)]
        admin_secret_dir: PathBuf,

        /// Directory holding vcs_username and vcs_password
        #[arg(long, default_value = keycloak::secrets::DEFAULT_VCS_SECRET_DIR)]
        vcs_secret_dir: PathBuf,

        /// Seconds to wait between attempts
        #[arg(long, default_value_t = 10)]
        retry_interval: u64,

        /// Verify the Keycloak TLS certificate (off by default for the in-cluster endpoint)
        #[arg(long)]
        verify_tls: bool,
    },
}

/// Gitea connection and desired state shared by `org` and `repo`
#[derive(Args, Debug)]
struct GiteaArgs {
    /// Base URL of the Gitea API server
    #[arg(long, env = "GITEA_URL")]
    gitea_url: String,

    /// API token (mutually exclusive with --login-user/--login-password)
    #[arg(long, env = "GITEA_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// User for basic auth
    #[arg(long, env = "GITEA_LOGIN_USER")]
    login_user: Option<String>,

    /// Password of the login user
    #[arg(long, env = "GITEA_LOGIN_PASSWORD", hide_env_values = true)]
    login_password: Option<String>,

    /// Desired state
    #[arg(long, default_value = "present", value_parser = ["present", "absent"])]
    state: String,
}

impl GiteaArgs {
    fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.gitea_url.clone(),
            api_token: self.api_token.clone(),
            login_user: self.login_user.clone(),
            login_password: self.login_password.clone(),
        }
    }
}

fn main() {
    // Initialize logging
    if let Err(e) = gitea_reconcile::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            print_outcome(&Outcome::failure(&e));
            process::exit(1);
        }
    }
}

/// Returns whether every reconciled resource succeeded
async fn run(cli: Cli) -> gitea_reconcile::Result<bool> {
    match cli.command {
        Commands::Org {
            username,
            description,
            full_name,
            location,
            website,
            gitea,
        } => {
            let org = Organization {
                username,
                description,
                full_name,
                location,
                website,
            };
            reconcile_one(&gitea, &org).await
        }

        Commands::Repo {
            name,
            org,
            user,
            description,
            auto_init,
            gitignores,
            license,
            private,
            readme,
            gitea,
        } => {
            let owner = RepoOwner::resolve(org.as_deref(), user.as_deref())?;
            let repo = Repository {
                name,
                owner,
                description,
                auto_init,
                gitignores,
                license,
                private,
                readme,
            };
            reconcile_one(&gitea, &repo).await
        }

        Commands::Apply { file } => apply(&file).await,

        Commands::KeycloakBootstrap {
            keycloak_base,
            realm,
            admin_secret_dir,
            vcs_secret_dir,
            retry_interval,
            verify_tls,
        } => {
            let settings = BootstrapSettings {
                keycloak_base,
                realm,
                admin_secret_dir,
                account_secret_dir: vcs_secret_dir,
                retry: RetryConfig::unbounded(Duration::from_secs(retry_interval)),
                verify_tls,
            };
            bootstrap::run(&settings).await?;
            Ok(true)
        }
    }
}

async fn reconcile_one(gitea: &GiteaArgs, resource: &dyn Resource) -> gitea_reconcile::Result<bool> {
    // Credentials are checked before any client is built
    let credentials: Credentials = gitea.connection().credentials()?;
    let target: TargetState = gitea.state.parse()?;
    let reconciler = Reconciler::new(&gitea.gitea_url, &credentials)?;

    let outcome = reconciler.reconcile(resource, target).await?;
    print_outcome(&outcome);
    Ok(true)
}

async fn apply(path: &Path) -> gitea_reconcile::Result<bool> {
    let file = ReconcileFile::load(path)?;
    validate_file_result(&file)?;

    let credentials = file.gitea.credentials()?;
    let reconciler = Reconciler::new(&file.gitea.url, &credentials)?;

    let mut failures = 0;

    for entry in &file.organizations {
        let result = reconciler.reconcile(&entry.organization, entry.state).await;
        failures += report(result);
    }

    for entry in &file.repositories {
        let result = match entry.to_repository() {
            Ok(repo) => reconciler.reconcile(&repo, entry.state).await,
            Err(e) => Err(e),
        };
        failures += report(result);
    }

    tracing::info!(
        organizations = file.organizations.len(),
        repositories = file.repositories.len(),
        failures,
        "Reconcile file applied"
    );

    Ok(failures == 0)
}

fn report(result: Result<Outcome, ReconcileError>) -> usize {
    match result {
        Ok(outcome) => {
            print_outcome(&outcome);
            0
        }
        Err(e) => {
            print_outcome(&Outcome::failure(&e));
            1
        }
    }
}

fn print_outcome(outcome: &Outcome) {
    match serde_json::to_string(outcome) {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("Failed to serialize result: {}", e),
    }
}
