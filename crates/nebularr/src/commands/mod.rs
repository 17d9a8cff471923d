//! Command dispatch: bridges CLI args -> reconcile engine -> output formatting.

pub mod diff;
pub mod fingerprint;
pub mod health;
pub mod reconcile;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use nebularr_config::Config;
use nebularr_core::{ManagedObject, ObjectStatus, Reconciler, Registry, StatusStore};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::store::FileStatusStore;

/// Loaded configuration plus the engine pieces every command shares.
pub struct Session {
    pub config: Config,
    pub config_path: PathBuf,
    pub store: Arc<FileStatusStore>,
    pub reconciler: Arc<Reconciler>,
    pub color: bool,
}

impl Session {
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let config_path = global
            .config
            .clone()
            .unwrap_or_else(nebularr_config::config_path);
        let config = nebularr_config::load_config(Some(&config_path))?;
        let store = Arc::new(FileStatusStore::new(config.status_dir()));
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(Registry::with_defaults()),
            config.settings(),
        ));
        tracing::debug!(
            instances = config.instances.len(),
            status_dir = %config.status_dir().display(),
            "session opened"
        );
        Ok(Self {
            config,
            config_path,
            store,
            reconciler,
            color: output::should_color(global.color),
        })
    }

    fn names(&self) -> Vec<&str> {
        self.config.instances.keys().map(String::as_str).collect()
    }

    fn ensure_instances(&self) -> Result<(), CliError> {
        if self.config.instances.is_empty() {
            return Err(CliError::NoInstances {
                path: self.config_path.display().to_string(),
            });
        }
        Ok(())
    }

    pub fn object(&self, name: &str) -> Result<ManagedObject, CliError> {
        self.config
            .object(name)
            .map_err(|e| CliError::from(e).with_available(&self.names()))
    }

    /// Objects for `names`, or every configured instance.
    pub fn objects(&self, names: &[String]) -> Result<Vec<ManagedObject>, CliError> {
        self.ensure_instances()?;
        self.config
            .objects(names)
            .map_err(|e| CliError::from(e).with_available(&self.names()))
    }

    /// Instance names for `name`, or every configured instance.
    pub fn instance_names(&self, name: Option<&str>) -> Result<Vec<String>, CliError> {
        match name {
            Some(name) => {
                self.config
                    .instance(name)
                    .map_err(|e| CliError::from(e).with_available(&self.names()))?;
                Ok(vec![name.to_owned()])
            }
            None => {
                self.ensure_instances()?;
                Ok(self.config.instances.keys().cloned().collect())
            }
        }
    }

    pub async fn status(&self, name: &str) -> Result<ObjectStatus, CliError> {
        Ok(self.store.load(name).await?.unwrap_or_default())
    }
}

/// Dispatch an engine-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let session = Session::open(global)?;
    match cmd {
        Command::Reconcile(args) => reconcile::handle(&session, args, global).await,
        Command::Diff(args) => diff::handle(&session, &args.instance, global).await,
        Command::Fingerprint(args) => fingerprint::handle(&session, &args.instance, global).await,
        Command::Health(args) => health::handle(&session, &args.instance, global).await,
        Command::Status(args) => status::handle(&session, args.instance.as_deref(), global).await,
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
