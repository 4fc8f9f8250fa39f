use crate::config::VaultConfig;
use crate::service::{Disposition, FileService, IngestRequest};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pinvault_meta::{FileRecord, JsonRecordStore, MemoryRecordStore, RecordStore};
use pinvault_reduce::CompressionPolicy;
use pinvault_storage::{alternative_gateways, ContentStore, MemoryContentStore, PinataStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command line for `pvault`.
#[derive(Parser)]
#[command(name = "pvault")]
#[command(about = "PinVault file storage CLI", long_about = None)]
pub struct Cli {
    /// Config file (TOML or JSON).
    #[arg(short, long, env = "PINVAULT_CONFIG", default_value = "pinvault.toml")]
    pub config: PathBuf,

    /// Use in-process content and record stores; nothing outlives the process.
    #[arg(long)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// `pvault` subcommands.
#[derive(Subcommand)]
pub enum Command {
    Upload {
        path: PathBuf,
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
        #[arg(long)]
        uploader: String,
        #[arg(long)]
        user_name: Option<String>,
        #[arg(long)]
        no_compress: bool,
    },
    Download {
        cid: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    Serve {
        cid: String,
    },
    Show {
        id: String,
    },
    List {
        #[arg(short, long)]
        uploader: Option<String>,
    },
    Delete {
        id: String,
    },
    Stats,
    Links {
        cid: String,
    },
    /// Check that the pinning service credential is usable.
    Connect,
}

impl Cli {
    /// Execute the parsed command.
    pub async fn run(self) -> Result<()> {
        let config = VaultConfig::load(&self.config)?;
        match self.command {
            Command::Links { ref cid } => return Self::links(&config, cid),
            Command::Connect => return Self::connect(&config),
            _ => {}
        }

        let service = self.service(&config)?;
        match self.command {
            Command::Upload {
                ref path,
                ref content_type,
                ref uploader,
                ref user_name,
                no_compress,
            } => {
                let enabled = config.compression_enabled && !no_compress;
                let user_name = user_name.clone();
                Self::upload(&service, path, content_type, uploader, user_name, enabled).await
            }
            Command::Download { ref cid, ref output } => {
                Self::download(&service, cid, output.as_deref()).await
            }
            Command::Serve { ref cid } => Self::serve(&service, cid).await,
            Command::Show { ref id } => Self::show(&service, id),
            Command::List { ref uploader } => Self::list(&service, uploader.as_deref()),
            Command::Delete { ref id } => Self::delete(&service, id),
            Command::Stats => Self::stats(&service),
            Command::Links { .. } | Command::Connect => Ok(()),
        }
    }

    fn service(&self, config: &VaultConfig) -> Result<FileService> {
        let (store, records): (Arc<dyn ContentStore>, Arc<dyn RecordStore>) = if self.offline {
            tracing::warn!("Offline mode: uploads and records live only for this process");
            (
                Arc::new(MemoryContentStore::new()),
                Arc::new(MemoryRecordStore::new()),
            )
        } else {
            let records = JsonRecordStore::open(&config.records_path).with_context(|| {
                format!("opening record store {}", config.records_path.display())
            })?;
            (
                Arc::new(PinataStore::new(config.remote.clone())?),
                Arc::new(records),
            )
        };
        let policy = CompressionPolicy::new(config.policy.clone(), Arc::new(config.codec()));
        Ok(FileService::new(policy, store, records))
    }

    async fn upload(
        service: &FileService,
        path: &Path,
        content_type: &str,
        uploader: &str,
        user_name: Option<String>,
        compression_enabled: bool,
    ) -> Result<()> {
        let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let mut request = IngestRequest::new(data, name, content_type, uploader)
            .with_compression(compression_enabled);
        if let Some(user_name) = user_name {
            request = request.with_user_name(user_name);
        }

        let record = match service.ingest(request).await {
            Ok(record) => record,
            Err(e) => {
                eprintln!("{}", e.user_message());
                return Err(e.into());
            }
        };
        Self::print_record(&record);
        Ok(())
    }

    async fn download(service: &FileService, cid: &str, output: Option<&Path>) -> Result<()> {
        let file = service.open(cid, Disposition::Attachment).await?;
        let target = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Self::local_name(&file.file_name));
        std::fs::write(&target, &file.bytes)
            .with_context(|| format!("writing {}", target.display()))?;
        println!(
            "Saved {} ({}) to {}",
            file.file_name,
            Self::format_bytes(file.bytes.len() as u64),
            target.display()
        );
        Ok(())
    }

    async fn serve(service: &FileService, cid: &str) -> Result<()> {
        let file = service.open(cid, Disposition::Inline).await?;
        println!("Content-Type: {}", file.content_type);
        println!("Content-Length: {}", file.bytes.len());
        println!("Content-Disposition: {}", file.content_disposition());
        println!("Cache-Control: {}", file.cache_control());
        Ok(())
    }

    fn show(service: &FileService, id: &str) -> Result<()> {
        match service.get(id)? {
            Some(record) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
                Ok(())
            }
            None => anyhow::bail!("No file record with id {}", id),
        }
    }

    fn list(service: &FileService, uploader: Option<&str>) -> Result<()> {
        let records = match uploader {
            Some(uploader) => service.list_by_uploader(uploader)?,
            None => service.list()?,
        };

        println!(
            "{:<38} {:<24} {:<24} {:>12} {:<5}",
            "ID", "NAME", "TYPE", "SIZE", "ZSTD"
        );
        println!("{}", "-".repeat(107));
        for record in records {
            println!(
                "{:<38} {:<24} {:<24} {:>12} {:<5}",
                record.id,
                record.descriptor.display_name(),
                record.descriptor.content_type,
                Self::format_bytes(record.descriptor.original_len()),
                if record.descriptor.is_compressed { "yes" } else { "no" }
            );
        }
        Ok(())
    }

    fn delete(service: &FileService, id: &str) -> Result<()> {
        if service.delete(id)? {
            println!("Deleted record {}", id);
            Ok(())
        } else {
            anyhow::bail!("No file record with id {}", id)
        }
    }

    fn stats(service: &FileService) -> Result<()> {
        let stats = service.stats()?;
        println!("Files: {}", stats.total_files);
        println!("Compressed: {}", stats.compressed_files);
        println!("Stored: {}", Self::format_bytes(stats.total_stored_bytes));
        println!("Original: {}", Self::format_bytes(stats.total_original_bytes));
        println!("Saved: {}", Self::format_bytes(stats.bytes_saved()));
        for (category, count) in &stats.by_category {
            println!("  {:<16} {}", category, count);
        }
        Ok(())
    }

    fn links(config: &VaultConfig, cid: &str) -> Result<()> {
        println!("Configured: {}", config.remote.gateway_link(cid));
        println!("{}", serde_json::to_string_pretty(&alternative_gateways(cid))?);
        Ok(())
    }

    fn connect(config: &VaultConfig) -> Result<()> {
        let store = PinataStore::new(config.remote.clone())?;
        store.connect()?;
        println!("Pinning client ready: {}", config.remote.api_url);
        Ok(())
    }

    fn print_record(record: &FileRecord) {
        println!("ID: {}", record.id);
        println!("CID: {}", record.content_address());
        println!("Name: {}", record.descriptor.display_name());
        println!("Stored: {}", Self::format_bytes(record.descriptor.stored_size));
        if let Some(ratio) = record.descriptor.ratio_percent {
            println!(
                "Compressed: {} -> {} ({:.1}% smaller)",
                Self::format_bytes(record.descriptor.original_len()),
                Self::format_bytes(record.descriptor.stored_size),
                ratio
            );
        }
        if let Some(url) = &record.gateway_url {
            println!("URL: {}", url);
        }
    }

    /// Final component of a recorded name, so downloads stay in the working directory.
    fn local_name(recorded: &str) -> PathBuf {
        Path::new(recorded)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("download"))
    }

    fn format_bytes(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.2} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.2} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.2} KB", bytes as f64 / KB as f64)
        } else {
            format!("{} B", bytes)
        }
    }
}
