mod config;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use client_core::{
    Collaborators, Credentials, Identity, NewCertification, NewExperience, NewProject, Operation,
    OperationState, ProfileController, ProfileEdit, ProfileImage, Registration, RestAuth,
    RestCatalog, StaticIdentity,
};
use futures::StreamExt;
use serde::Serialize;
use shared::domain::{CompanyId, EventId, JobOfferId, UserId, UserProfile};
use storage::Storage;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::info;

use crate::config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(name = "sleeveup", about = "Browse jobs, companies and events; manage your profile")]
struct Args {
    /// Backend base URL; overrides the settings file and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Act as this user without signing in.
    #[arg(long, global = true, conflicts_with = "email")]
    user: Option<String>,
    #[arg(long, global = true, requires = "password")]
    email: Option<String>,
    #[arg(long, global = true)]
    password: Option<String>,
    /// Print every state transition to stderr.
    #[arg(long, global = true)]
    watch: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Companies {
        #[arg(long)]
        search: Option<String>,
    },
    Company {
        id: String,
        /// Also list the company's job offers.
        #[arg(long)]
        jobs: bool,
    },
    Jobs {
        #[arg(long)]
        search: Option<String>,
    },
    Job {
        id: String,
    },
    Events {
        #[arg(long)]
        search: Option<String>,
        /// Only events that have not started yet, soonest first.
        #[arg(long)]
        upcoming: bool,
    },
    Event {
        id: String,
    },
    /// Checks `--email`/`--password` against the backend. The session is not
    /// kept after exit; pass the same flags to commands that need a user.
    Login,
    Register {
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    Profile,
    ProfileImage,
    UpdateProfile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        headline: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        /// Image file to store as the profile picture.
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Applications,
    Apply {
        job_id: String,
    },
    Withdraw {
        job_id: String,
    },
    AddProject {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        link: Option<String>,
    },
    RemoveProject {
        id: String,
    },
    AddCertification {
        name: String,
        #[arg(long, default_value = "")]
        issuer: String,
        #[arg(long)]
        issued_on: Option<NaiveDate>,
    },
    RemoveCertification {
        id: String,
    },
    AddExperience {
        role: String,
        company: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        started_on: Option<NaiveDate>,
        #[arg(long)]
        ended_on: Option<NaiveDate>,
    },
    RemoveExperience {
        id: String,
    },
}

struct App {
    collaborators: Collaborators,
    storage: Arc<Storage>,
    identity: Arc<dyn Identity>,
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings();
    if let Some(api_url) = &args.api_url {
        settings.api_base_url = api_url.clone();
    }
    if let Some(database_url) = &args.database_url {
        settings.database_url = normalize_database_url(database_url);
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    let catalog = Arc::new(RestCatalog::new(
        &settings.api_base_url,
        settings.request_timeout(),
    )?);
    let auth = Arc::new(RestAuth::new(
        &settings.api_base_url,
        settings.request_timeout(),
    )?);
    let storage = Arc::new(
        Storage::new(&settings.database_url)
            .await
            .with_context(|| format!("failed to open store '{}'", settings.database_url))?,
    );
    storage.health_check().await?;
    let identity: Arc<dyn Identity> = match &args.user {
        Some(user) => Arc::new(StaticIdentity::signed_in(UserId::new(user.as_str()))),
        None => auth.clone(),
    };
    info!(api = %settings.api_base_url, store = %settings.database_url, "sleeveup starting");

    let app = App {
        collaborators: Collaborators::default()
            .with_catalog(catalog)
            .with_records(storage.clone())
            .with_blobs(storage.clone())
            .with_identity(identity.clone())
            .with_auth(auth),
        storage,
        identity,
        watch: args.watch,
    };

    let credentials = match (&args.email, &args.password) {
        (Some(email), Some(password)) => Some(Credentials {
            email: email.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    match args.command {
        Command::Login => {
            let Some(credentials) = credentials else {
                bail!("login needs --email and --password");
            };
            let user_id = app.sign_in(credentials).await?;
            println!("credentials accepted for {user_id}");
        }
        Command::Register {
            first_name,
            last_name,
        } => {
            let Some(credentials) = credentials else {
                bail!("register needs --email and --password");
            };
            let controller = app.collaborators.auth_controller();
            let states = app.watcher(controller.session());
            let user_id = finish(
                controller.session(),
                states,
                controller.register(Registration {
                    email: credentials.email,
                    password: credentials.password,
                    first_name,
                    last_name,
                }),
            )
            .await?;
            println!("registered {user_id}");
        }
        command => {
            if let Some(credentials) = credentials {
                app.sign_in(credentials).await?;
            }
            app.run(command).await?;
        }
    }

    Ok(())
}

impl App {
    fn watcher<T>(&self, op: &Operation<T>) -> Option<WatchStream<OperationState<T>>>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.watch.then(|| op.stream())
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<UserId> {
        let controller = self.collaborators.auth_controller();
        let states = self.watcher(controller.session());
        finish(controller.session(), states, controller.sign_in(credentials)).await
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Companies { search } => {
                let controller = self.collaborators.companies_controller();
                let states = self.watcher(controller.companies());
                let listing =
                    finish(controller.companies(), states, controller.load_companies()).await?;
                match search {
                    Some(query) => print_json(&controller.search(&query))?,
                    None => print_json(&listing)?,
                }
            }
            Command::Company { id, jobs } => {
                let controller = self.collaborators.company_detail_controller();
                let id = CompanyId::new(id);
                let states = self.watcher(controller.company());
                let company =
                    finish(controller.company(), states, controller.load_company(id.clone()))
                        .await?;
                print_json(&company)?;
                if jobs {
                    let states = self.watcher(controller.jobs());
                    let listing =
                        finish(controller.jobs(), states, controller.load_company_jobs(id)).await?;
                    print_json(&listing)?;
                }
            }
            Command::Jobs { search } => {
                let controller = self.collaborators.jobs_controller();
                let states = self.watcher(controller.jobs());
                let listing = finish(controller.jobs(), states, controller.load_jobs()).await?;
                match search {
                    Some(query) => print_json(&controller.search(&query))?,
                    None => print_json(&listing)?,
                }
            }
            Command::Job { id } => {
                let controller = self.collaborators.job_detail_controller();
                let states = self.watcher(controller.job());
                let handle = controller.load(JobOfferId::new(id));
                let ((), loaded) =
                    tokio::join!(print_states(controller.job().name(), states), handle);
                loaded.context("job loader panicked")?;
                let job = settle(controller.job().name(), controller.job().snapshot())?;
                print_json(&job)?;
                match controller.company().snapshot() {
                    OperationState::Completed(company) => print_json(&company)?,
                    OperationState::Failed(reason) => eprintln!("company unavailable: {reason}"),
                    _ => {}
                }
            }
            Command::Events { search, upcoming } => {
                let controller = self.collaborators.events_controller();
                let states = self.watcher(controller.events());
                let listing =
                    finish(controller.events(), states, controller.load_events()).await?;
                if upcoming {
                    print_json(&controller.upcoming(Utc::now()))?;
                } else if let Some(query) = search {
                    print_json(&controller.search(&query))?;
                } else {
                    print_json(&listing)?;
                }
            }
            Command::Event { id } => {
                let controller = self.collaborators.events_controller();
                let states = self.watcher(controller.event());
                let event =
                    finish(controller.event(), states, controller.load_event(EventId::new(id)))
                        .await?;
                print_json(&event)?;
            }
            Command::Profile => {
                let controller = self.collaborators.profile_controller();
                let states = self.watcher(controller.profile());
                let profile =
                    finish(controller.profile(), states, controller.load_profile()).await?;
                print_json(&profile)?;
            }
            Command::ProfileImage => {
                let controller = self.collaborators.profile_controller();
                let states = self.watcher(controller.image());
                match finish(controller.image(), states, controller.load_image()).await? {
                    ProfileImage::Stored(bytes) => println!("stored image, {} bytes", bytes.len()),
                    ProfileImage::Placeholder => println!("placeholder image"),
                }
            }
            Command::UpdateProfile {
                first_name,
                last_name,
                headline,
                bio,
                image,
            } => {
                let image_path = match image {
                    Some(file) => Some(self.upload_image(&file).await?),
                    None => None,
                };
                let controller = self.collaborators.profile_controller();
                let edit = ProfileEdit {
                    first_name,
                    last_name,
                    headline,
                    bio,
                    image_path,
                };
                self.print_update(&controller, controller.update_profile(edit))
                    .await?;
            }
            Command::Applications => {
                let controller = self.collaborators.profile_controller();
                finish(controller.profile(), None, controller.load_profile()).await?;
                print_json(&controller.pending_applications())?;
            }
            Command::Apply { job_id } => self.change_application(job_id, true).await?,
            Command::Withdraw { job_id } => self.change_application(job_id, false).await?,
            Command::AddProject {
                title,
                description,
                link,
            } => {
                let controller = self.collaborators.profile_controller();
                let handle = controller.add_project(NewProject {
                    title,
                    description,
                    link,
                });
                self.print_update(&controller, handle).await?;
            }
            Command::RemoveProject { id } => {
                let controller = self.collaborators.profile_controller();
                self.print_update(&controller, controller.remove_project(id))
                    .await?;
            }
            Command::AddCertification {
                name,
                issuer,
                issued_on,
            } => {
                let controller = self.collaborators.profile_controller();
                let handle = controller.add_certification(NewCertification {
                    name,
                    issuer,
                    issued_on,
                });
                self.print_update(&controller, handle).await?;
            }
            Command::RemoveCertification { id } => {
                let controller = self.collaborators.profile_controller();
                self.print_update(&controller, controller.remove_certification(id))
                    .await?;
            }
            Command::AddExperience {
                role,
                company,
                description,
                started_on,
                ended_on,
            } => {
                let controller = self.collaborators.profile_controller();
                let handle = controller.add_experience(NewExperience {
                    role,
                    company,
                    description,
                    started_on,
                    ended_on,
                });
                self.print_update(&controller, handle).await?;
            }
            Command::RemoveExperience { id } => {
                let controller = self.collaborators.profile_controller();
                self.print_update(&controller, controller.remove_experience(id))
                    .await?;
            }
            Command::Login | Command::Register { .. } => {
                bail!("sign-in commands do not run against an open session")
            }
        }
        Ok(())
    }

    async fn change_application(&self, job_id: String, apply: bool) -> Result<()> {
        let controller = self.collaborators.job_detail_controller();
        controller
            .load(JobOfferId::new(job_id))
            .await
            .context("job loader panicked")?;
        settle(controller.job().name(), controller.job().snapshot())?;
        finish(controller.applicant(), None, controller.load_applicant()).await?;

        let states = self.watcher(controller.application());
        let handle = if apply {
            controller.apply()
        } else {
            controller.withdraw()
        };
        let profile = finish(controller.application(), states, handle).await?;
        println!(
            "{} pending application(s); applied to this offer: {}",
            profile.pending_applications.len(),
            controller.has_applied()
        );
        Ok(())
    }

    async fn print_update(
        &self,
        controller: &ProfileController,
        handle: JoinHandle<OperationState<UserProfile>>,
    ) -> Result<()> {
        let profile = finish(controller.update(), None, handle).await?;
        print_json(&profile)
    }

    /// Copies `file` into the blob store under the signed-in user's image path.
    async fn upload_image(&self, file: &Path) -> Result<String> {
        let Some(user_id) = self.identity.current_user_id().await else {
            bail!("user is not signed in");
        };
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("failed to read image '{}'", file.display()))?;
        let extension = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let mime_type = match extension.as_deref() {
            Some("png") => Some("image/png"),
            Some("jpg" | "jpeg") => Some("image/jpeg"),
            Some("gif") => Some("image/gif"),
            Some("webp") => Some("image/webp"),
            _ => None,
        };
        let path = match &extension {
            Some(ext) => format!("profile_images/{user_id}.{ext}"),
            None => format!("profile_images/{user_id}"),
        };
        self.storage.store_blob(&path, &bytes, mime_type).await?;
        info!(%user_id, %path, size = bytes.len(), "stored profile image");
        Ok(path)
    }
}

/// Awaits `handle`, echoing transitions from `states` meanwhile, and turns the
/// final state into the completed value or an error carrying the reason.
async fn finish<T>(
    op: &Operation<T>,
    states: Option<WatchStream<OperationState<T>>>,
    handle: JoinHandle<OperationState<T>>,
) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    let ((), joined) = tokio::join!(print_states(op.name(), states), handle);
    let state = joined.with_context(|| format!("{} task panicked", op.name()))?;
    settle(op.name(), state)
}

async fn print_states<T>(name: &str, states: Option<WatchStream<OperationState<T>>>)
where
    T: Clone + Send + Sync + 'static,
{
    let Some(mut states) = states else {
        return;
    };
    while let Some(state) = states.next().await {
        eprintln!("[{name}] {}", state.label());
        if state.is_settled() {
            break;
        }
    }
}

fn settle<T>(name: &str, state: OperationState<T>) -> Result<T> {
    match state {
        OperationState::Completed(value) => Ok(value),
        OperationState::Failed(reason) => bail!("{name} failed: {reason}"),
        other => bail!("{name} ended {}", other.label()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
