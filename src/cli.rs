//! Command-line surface and per-command drivers.
//!
//! One binary, one command selector. The storage commands operate on a bucket
//! named with `--bucket`; `publish` and `subscribe` operate on a
//! `--project`-scoped topic or subscription. The two credential flags are
//! mutually exclusive; with neither, application-default credentials are
//! used.
//!
//! Exit status is 0 on full success and non-zero on any fatal condition:
//! missing or conflicting configuration, a fatal open/list/copy error, or an
//! upload-batch item failure. Per-item failures in download/rm batches are
//! diagnostics, not fatal conditions.

use crate::config::{ConfigError, CredentialsSource};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cloudpipe",
    version,
    about = "Pipe data between local processes and managed cloud services"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Credential selection, shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Path to a service account credentials file
    #[arg(long, value_name = "PATH", conflicts_with = "credentials_json")]
    pub credentials_file: Option<PathBuf>,

    /// JSON content of a service account credentials file
    #[arg(long, value_name = "JSON")]
    pub credentials_json: Option<String>,
}

impl CredentialArgs {
    pub fn resolve(&self) -> Result<CredentialsSource, ConfigError> {
        CredentialsSource::resolve(
            self.credentials_file.clone(),
            self.credentials_json.clone(),
        )
    }
}

#[derive(Args, Debug, Clone)]
pub struct BucketArgs {
    /// Bucket name
    #[arg(long)]
    pub bucket: String,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PubsubArgs {
    /// Project ID
    #[arg(long)]
    pub project: String,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// List bucket objects, optionally filtered by a name prefix
    Ls {
        #[command(flatten)]
        bucket: BucketArgs,

        /// Only list objects whose names start with this prefix
        prefix: Option<String>,
    },

    /// Download objects from the bucket into same-named local files
    Download {
        #[command(flatten)]
        bucket: BucketArgs,

        #[arg(required = true, value_name = "OBJECT")]
        objects: Vec<String>,
    },

    /// Upload local files to same-named bucket objects
    Upload {
        #[command(flatten)]
        bucket: BucketArgs,

        #[arg(required = true, value_name = "FILE")]
        files: Vec<String>,
    },

    /// Copy one bucket object to stdout
    Read {
        #[command(flatten)]
        bucket: BucketArgs,

        #[arg(value_name = "OBJECT")]
        object: String,
    },

    /// Copy stdin into one bucket object
    Write {
        #[command(flatten)]
        bucket: BucketArgs,

        #[arg(value_name = "OBJECT")]
        object: String,
    },

    /// Delete objects from the bucket
    Rm {
        #[command(flatten)]
        bucket: BucketArgs,

        #[arg(required = true, value_name = "OBJECT")]
        objects: Vec<String>,
    },

    /// Publish one message per stdin line to a topic
    Publish {
        #[command(flatten)]
        pubsub: PubsubArgs,

        /// Topic name
        #[arg(long)]
        topic: String,
    },

    /// Stream a subscription's messages to stdout, one line per message
    Subscribe {
        #[command(flatten)]
        pubsub: PubsubArgs,

        /// Subscription name
        #[arg(long)]
        subscription: String,

        /// Suppress message output (acknowledge behavior is unchanged)
        #[arg(long)]
        quiet: bool,

        /// Never acknowledge deliveries; the broker will redeliver them
        #[arg(long = "no-ack")]
        no_ack: bool,
    },
}

#[cfg(all(feature = "gcs", feature = "pubsub"))]
pub use self::drivers::run;

#[cfg(all(feature = "gcs", feature = "pubsub"))]
mod drivers {
    use super::{BucketArgs, Cli, Command, PubsubArgs};
    use crate::batch::{self, BatchLabel, BatchPolicy};
    use crate::cancel::CancelToken;
    use crate::config::CredentialsSource;
    use crate::deliver::{self, DeliveryOptions};
    use crate::publish;
    use crate::remote::gcs::GcsStore;
    use crate::remote::pubsub::{SubscriptionFeed, TopicPublisher};
    use anyhow::Result;
    use std::io;
    use std::process::ExitCode;
    use tracing::debug;

    /// Dispatch one parsed invocation and map it to an exit status.
    pub fn run(cli: Cli) -> ExitCode {
        match cli.command {
            Command::Ls { bucket, prefix } => cmd_ls(&bucket, prefix.as_deref().unwrap_or("")),
            Command::Download { bucket, objects } => cmd_download(&bucket, &objects),
            Command::Upload { bucket, files } => cmd_upload(&bucket, &files),
            Command::Read { bucket, object } => cmd_read(&bucket, &object),
            Command::Write { bucket, object } => cmd_write(&bucket, &object),
            Command::Rm { bucket, objects } => cmd_rm(&bucket, &objects),
            Command::Publish { pubsub, topic } => cmd_publish(&pubsub, &topic),
            Command::Subscribe {
                pubsub,
                subscription,
                quiet,
                no_ack,
            } => cmd_subscribe(&pubsub, &subscription, quiet, no_ack),
        }
    }

    fn open_store(args: &BucketArgs) -> Result<GcsStore> {
        let credentials = args.credentials.resolve()?;
        Ok(GcsStore::connect(&args.bucket, &credentials)?)
    }

    fn resolve_credentials(args: &PubsubArgs) -> Result<CredentialsSource> {
        Ok(args.credentials.resolve()?)
    }

    fn fatal(err: &anyhow::Error) -> ExitCode {
        eprintln!("{err:#}");
        ExitCode::FAILURE
    }

    fn cmd_ls(args: &BucketArgs, prefix: &str) -> ExitCode {
        let store = match open_store(args) {
            Ok(store) => store,
            Err(err) => return fatal(&err),
        };
        let stdout = io::stdout();
        match batch::list_objects(&store, prefix, &mut stdout.lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => fatal(&err),
        }
    }

    fn cmd_download(args: &BucketArgs, objects: &[String]) -> ExitCode {
        let store = match open_store(args) {
            Ok(store) => store,
            Err(err) => return fatal(&err),
        };
        let report = batch::run_batch(
            objects,
            BatchPolicy::ContinueOnError,
            BatchLabel::new("Downloaded", "object(s)"),
            &mut io::stderr(),
            |name| batch::download_object(&store, name),
        );
        debug!(succeeded = report.succeeded, "download batch finished");
        ExitCode::SUCCESS
    }

    fn cmd_upload(args: &BucketArgs, files: &[String]) -> ExitCode {
        let store = match open_store(args) {
            Ok(store) => store,
            Err(err) => return fatal(&err),
        };
        let report = batch::run_batch(
            files,
            BatchPolicy::AbortOnError,
            BatchLabel::new("Uploaded", "file(s)"),
            &mut io::stderr(),
            |name| batch::upload_file(&store, name),
        );
        if report.aborted {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }

    fn cmd_read(args: &BucketArgs, object: &str) -> ExitCode {
        let store = match open_store(args) {
            Ok(store) => store,
            Err(err) => return fatal(&err),
        };
        let stdout = io::stdout();
        match batch::read_object(&store, object, &mut stdout.lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("[{object}] {err:#}");
                ExitCode::FAILURE
            }
        }
    }

    fn cmd_write(args: &BucketArgs, object: &str) -> ExitCode {
        let store = match open_store(args) {
            Ok(store) => store,
            Err(err) => return fatal(&err),
        };
        let stdin = io::stdin();
        match batch::write_object(&store, object, &mut stdin.lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("[{object}] {err:#}");
                ExitCode::FAILURE
            }
        }
    }

    fn cmd_rm(args: &BucketArgs, objects: &[String]) -> ExitCode {
        let store = match open_store(args) {
            Ok(store) => store,
            Err(err) => return fatal(&err),
        };
        let report = batch::run_batch(
            objects,
            BatchPolicy::ContinueOnError,
            BatchLabel::new("Deleted", "object(s)"),
            &mut io::stderr(),
            |name| batch::delete_object(&store, name),
        );
        debug!(succeeded = report.succeeded, "delete batch finished");
        ExitCode::SUCCESS
    }

    fn cmd_publish(args: &PubsubArgs, topic: &str) -> ExitCode {
        let publisher = match resolve_credentials(args)
            .and_then(|credentials| Ok(TopicPublisher::connect(&args.project, topic, &credentials)?))
        {
            Ok(publisher) => publisher,
            Err(err) => return fatal(&err),
        };
        let stdin = io::stdin();
        match publish::pump(stdin.lock(), &publisher) {
            Ok(stats) => {
                debug!(published = stats.published, "publish finished");
                ExitCode::SUCCESS
            }
            Err(err) => fatal(&err),
        }
    }

    fn cmd_subscribe(args: &PubsubArgs, subscription: &str, quiet: bool, no_ack: bool) -> ExitCode {
        let feed = match resolve_credentials(args).and_then(|credentials| {
            Ok(SubscriptionFeed::connect(&args.project, subscription, &credentials)?)
        }) {
            Ok(feed) => feed,
            Err(err) => return fatal(&err),
        };
        let cancel = CancelToken::new();
        cancel_on_ctrl_c(cancel.clone());
        let options = DeliveryOptions {
            quiet,
            acknowledge: !no_ack,
        };
        match deliver::run_subscription(&feed, &cancel, options, io::stdout()) {
            Ok(serializer) => {
                debug!(
                    delivered = serializer.delivered(),
                    acked = serializer.acked(),
                    "subscription ended"
                );
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("{err}");
                ExitCode::FAILURE
            }
        }
    }

    /// Wire Ctrl-C to the cancellation token so the delivery session stops
    /// deterministically instead of dying mid-write.
    fn cancel_on_ctrl_c(cancel: CancelToken) {
        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(_) => return,
            };
            if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                cancel.cancel();
            }
        });
    }
}
