//! taskdeck command-line front end.
//!
//! Runs one session as the configured user: loads the stores, applies the
//! requested command through them, and prints the result.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::sync::Arc;
use taskdeck::cli::category::CategoryCommand;
use taskdeck::cli::project::ProjectCommand;
use taskdeck::cli::task::{AddTaskArgs, EditTaskArgs, TaskCommand};
use taskdeck::cli::{Cli, Command};
use taskdeck::config::{Backend, Config};
use taskdeck::db::Database;
use taskdeck::document::{DocumentStore, MemoryDocumentStore};
use taskdeck::format::{self, OutputFormat};
use taskdeck::identity::{AuthUser, IdentityProvider, LocalIdentity};
use taskdeck::logging::{self, LogTarget};
use taskdeck::repo::EntityRepository;
use taskdeck::session::Session;
use taskdeck::store::{EntityStore, StoreState};
use taskdeck::types::{
    DueDate, NewCategory, NewProject, NewTask, ProjectUpdate, TaskCategory, TaskStatus, TaskUpdate,
};
use taskdeck::validation;
use taskdeck::views::{self, DashboardSummary};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(db_path) = &cli.database {
        config.storage.db_path = db_path.clone();
    }
    if cli.memory {
        config.storage.backend = Backend::Memory;
    }
    if let Some(user) = &cli.user {
        config.user.id = user.clone();
    }

    let documents = open_store(&config)?;
    let session = Session::new(documents);

    let mut user = AuthUser::new(config.user.id.clone());
    user.email = config.user.email.clone();
    user.display_name = config.user.name.clone();
    let identity = LocalIdentity::signed_in(user);

    session
        .on_auth_change(identity.current())
        .await
        .context("failed to load user profile")?;

    run_command(&session, &identity, cli.command, cli.format).await
}

fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    match config.storage.backend {
        Backend::Memory => {
            info!("using in-memory document store");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
        Backend::Sqlite => {
            config.ensure_db_dir()?;
            info!(path = %config.storage.db_path.display(), "opening document store");
            Ok(Arc::new(Database::open(&config.storage.db_path)?))
        }
    }
}

fn current_uid(identity: &dyn IdentityProvider) -> Result<String> {
    identity
        .current()
        .map(|u| u.uid)
        .ok_or_else(|| anyhow!("not signed in"))
}

/// Turn a failed store operation into a command error carrying the store's
/// message.
fn ensure_ok<R: EntityRepository>(
    ok: bool,
    store: &EntityStore<R>,
) -> Result<StoreState<R::Entity>> {
    let state = store.snapshot();
    if ok {
        Ok(state)
    } else {
        Err(anyhow!(
            state
                .error
                .unwrap_or_else(|| format!("{} operation failed", store.kind().singular()))
        ))
    }
}

/// The store's entities, or its failure message if the last load failed.
fn loaded<R: EntityRepository>(store: &EntityStore<R>) -> Result<Vec<R::Entity>> {
    let state = store.snapshot();
    match state.error {
        Some(message) => Err(anyhow!(message)),
        None => Ok(state.entities),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", format::to_json(value)?);
    Ok(())
}

async fn run_command(
    session: &Session,
    identity: &dyn IdentityProvider,
    command: Command,
    output: OutputFormat,
) -> Result<()> {
    match command {
        Command::Task(cmd) => run_task(session, identity, cmd, output).await,
        Command::Project(cmd) => run_project(session, identity, cmd, output).await,
        Command::Category(cmd) => run_category(session, identity, cmd, output).await,
        Command::Dashboard => {
            let summary =
                DashboardSummary::compute(&loaded(&session.tasks)?, &loaded(&session.projects)?);
            match output {
                OutputFormat::Json => print_json(&summary),
                OutputFormat::Markdown => {
                    print!("{}", format::format_summary_markdown(&summary));
                    Ok(())
                }
            }
        }
        Command::Calendar => {
            let days = views::agenda(&loaded(&session.tasks)?);
            match output {
                OutputFormat::Json => print_json(&days),
                OutputFormat::Markdown => {
                    print!("{}", format::format_agenda_markdown(&days));
                    Ok(())
                }
            }
        }
    }
}

fn new_task(uid: String, args: AddTaskArgs) -> Result<NewTask> {
    Ok(NewTask {
        user_id: uid,
        title: validation::task_title(&args.title)?,
        description: args.description,
        project_id: args.project,
        status: args.status.unwrap_or_default(),
        priority: args.priority.unwrap_or_default(),
        due_date: args.due.map(DueDate::Date),
        category_ids: None,
    })
}

fn task_update(args: &EditTaskArgs) -> Result<TaskUpdate> {
    let title = args
        .title
        .as_deref()
        .map(validation::task_title)
        .transpose()?;
    let description = if args.clear_description {
        Some(None)
    } else {
        args.description.clone().map(Some)
    };
    let due_date = if args.clear_due {
        Some(None)
    } else {
        args.due.map(|d| Some(DueDate::Date(d)))
    };
    Ok(TaskUpdate {
        title,
        description,
        status: args.status,
        priority: args.priority,
        due_date,
        ..TaskUpdate::default()
    })
}

async fn run_task(
    session: &Session,
    identity: &dyn IdentityProvider,
    cmd: TaskCommand,
    output: OutputFormat,
) -> Result<()> {
    let store = &session.tasks;
    match cmd {
        TaskCommand::Add(args) => {
            let data = new_task(current_uid(identity)?, args)?;
            let state = ensure_ok(store.add(data).await, store)?;
            let created = state
                .entities
                .first()
                .ok_or_else(|| anyhow!("created task missing from store"))?;
            match output {
                OutputFormat::Json => print_json(created),
                OutputFormat::Markdown => {
                    print!("{}", format::format_task_markdown(created));
                    Ok(())
                }
            }
        }
        TaskCommand::List(args) => {
            let tasks = loaded(store)?;
            let view = views::task_view(&tasks, &args.filter(), &args.sort());
            match output {
                OutputFormat::Json => print_json(&view),
                OutputFormat::Markdown => {
                    print!("{}", format::format_tasks_markdown(&view));
                    Ok(())
                }
            }
        }
        TaskCommand::Edit(args) => {
            let updates = task_update(&args)?;
            let ok = match args.if_unchanged_since.as_deref() {
                Some(raw) => {
                    let expected: DateTime<Utc> = DateTime::parse_from_rfc3339(raw)
                        .with_context(|| format!("invalid timestamp '{}'", raw))?
                        .with_timezone(&Utc);
                    store.edit_checked(&args.id, expected, updates).await
                }
                None => store.edit(&args.id, updates).await,
            };
            print_task(ensure_ok(ok, store)?.get(&args.id), &args.id, output)
        }
        TaskCommand::Done { id } => {
            let ok = store.edit(&id, TaskUpdate::status(TaskStatus::Completed)).await;
            print_task(ensure_ok(ok, store)?.get(&id), &id, output)
        }
        TaskCommand::Rm { id } => {
            ensure_ok(store.remove(&id).await, store)?;
            println!("Deleted task {}", id);
            Ok(())
        }
        TaskCommand::Categorize {
            task_id,
            category_id,
        } => {
            let link = TaskCategory {
                task_id,
                category_id,
            };
            session.task_categories.add(&link).await?;
            println!("Filed task {} under category {}", link.task_id, link.category_id);
            Ok(())
        }
        TaskCommand::Categories { task_id } => {
            let links = session.task_categories.list_for_task(&task_id).await?;
            let categories = loaded(&session.categories)?;
            let filed: Vec<_> = categories
                .into_iter()
                .filter(|c| links.iter().any(|l| l.category_id == c.id))
                .collect();
            match output {
                OutputFormat::Json => print_json(&filed),
                OutputFormat::Markdown => {
                    print!("{}", format::format_categories_markdown(&filed));
                    Ok(())
                }
            }
        }
    }
}

fn print_task(task: Option<&taskdeck::types::Task>, id: &str, output: OutputFormat) -> Result<()> {
    let Some(task) = task else {
        // The edit succeeded remotely but the task is not in this owner's list.
        debug!(task_id = %id, "edited task not in cached list");
        println!("Updated task {}", id);
        return Ok(());
    };
    match output {
        OutputFormat::Json => print_json(task),
        OutputFormat::Markdown => {
            print!("{}", format::format_task_markdown(task));
            Ok(())
        }
    }
}

async fn run_project(
    session: &Session,
    identity: &dyn IdentityProvider,
    cmd: ProjectCommand,
    output: OutputFormat,
) -> Result<()> {
    let store = &session.projects;
    match cmd {
        ProjectCommand::Add { name, description } => {
            let data = NewProject {
                name: validation::project_name(&name)?,
                description: description.map(|d| d.trim().to_string()),
                user_id: current_uid(identity)?,
            };
            let state = ensure_ok(store.add(data).await, store)?;
            let created = state
                .entities
                .first()
                .ok_or_else(|| anyhow!("created project missing from store"))?;
            match output {
                OutputFormat::Json => print_json(created),
                OutputFormat::Markdown => {
                    print!("{}", format::format_project_markdown(created));
                    Ok(())
                }
            }
        }
        ProjectCommand::List => {
            let projects = loaded(store)?;
            match output {
                OutputFormat::Json => print_json(&projects),
                OutputFormat::Markdown => {
                    print!("{}", format::format_projects_markdown(&projects));
                    Ok(())
                }
            }
        }
        ProjectCommand::Edit {
            id,
            name,
            description,
            clear_description,
        } => {
            if name.is_none() && description.is_none() && !clear_description {
                bail!("nothing to change: pass --name, --description or --clear-description");
            }
            let description = if clear_description {
                Some(None)
            } else {
                description.map(|d| Some(d.trim().to_string()))
            };
            let updates = ProjectUpdate {
                name: name.as_deref().map(validation::project_name).transpose()?,
                description,
            };
            let state = ensure_ok(store.edit(&id, updates).await, store)?;
            match (state.get(&id), output) {
                (Some(project), OutputFormat::Json) => print_json(project),
                (Some(project), OutputFormat::Markdown) => {
                    print!("{}", format::format_project_markdown(project));
                    Ok(())
                }
                (None, _) => {
                    println!("Updated project {}", id);
                    Ok(())
                }
            }
        }
        ProjectCommand::Rm { id } => {
            ensure_ok(store.remove(&id).await, store)?;
            println!("Deleted project {}", id);
            Ok(())
        }
    }
}

async fn run_category(
    session: &Session,
    identity: &dyn IdentityProvider,
    cmd: CategoryCommand,
    output: OutputFormat,
) -> Result<()> {
    let store = &session.categories;
    match cmd {
        CategoryCommand::Add { name } => {
            let data = NewCategory {
                name: validation::category_name(&name)?,
                user_id: current_uid(identity)?,
            };
            let state = ensure_ok(store.add(data).await, store)?;
            let created = state
                .entities
                .first()
                .ok_or_else(|| anyhow!("created category missing from store"))?;
            match output {
                OutputFormat::Json => print_json(created),
                OutputFormat::Markdown => {
                    print!("{}", format::format_categories_markdown(std::slice::from_ref(created)));
                    Ok(())
                }
            }
        }
        CategoryCommand::List => {
            let categories = loaded(store)?;
            match output {
                OutputFormat::Json => print_json(&categories),
                OutputFormat::Markdown => {
                    print!("{}", format::format_categories_markdown(&categories));
                    Ok(())
                }
            }
        }
        CategoryCommand::Rm { id } => {
            ensure_ok(store.remove(&id).await, store)?;
            println!("Deleted category {}", id);
            Ok(())
        }
    }
}
