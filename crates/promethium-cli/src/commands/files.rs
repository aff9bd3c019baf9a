//! `promethium files ...`

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use uuid::Uuid;

use promethium::{FileId, ListFileParams, PromethiumClient};

use super::common::print_json;
use crate::cli::FileCommand;

/// Execute a files subcommand.
pub async fn execute(client: &PromethiumClient, command: FileCommand) -> Result<()> {
    let files = client.files();
    match command {
        FileCommand::Ls { dir, search } => {
            let mut params = match dir {
                Some(dir) => ListFileParams::in_directory(FileId::new(dir)),
                None => ListFileParams::default(),
            };
            if let Some(search) = search {
                params = params.with_search(search);
            }
            print_json(&files.list_all(&params).await?)
        }

        FileCommand::Cp { src, dest } => {
            if is_remote_id(&src) {
                let dir = Path::new(&dest);
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {dest}"))?;
                let path = files.download_to(&FileId::new(src), dir).await?;
                eprintln!("{} Saved {}", style("✓").green().bold(), path.display());
                Ok(())
            } else {
                let local = Path::new(&src);
                if !local.exists() {
                    anyhow::bail!("File not found: {src}");
                }
                let created = files.upload_path(local, Some(&FileId::new(dest))).await?;
                eprintln!(
                    "{} Uploaded {} file(s)",
                    style("✓").green().bold(),
                    created.len()
                );
                print_json(&created)
            }
        }

        FileCommand::Mv { src, dir } => {
            let parent = dir.map(FileId::new);
            print_json(&files.mv(&FileId::new(src), parent.as_ref()).await?)
        }

        FileCommand::Mkdir { name, dir } => {
            let parent = dir.map(FileId::new);
            print_json(&files.mkdir(&name, parent.as_ref()).await?)
        }

        FileCommand::Rm { id } => {
            files.rm(&FileId::new(&*id)).await?;
            println!("{id}");
            Ok(())
        }

        FileCommand::Get { id } => print_json(&files.metadata(&FileId::new(id)).await?),

        FileCommand::Data { id } => {
            let bytes = files.download(&FileId::new(id)).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Remote file ids are UUIDs; anything else is a local path.
pub fn is_remote_id(src: &str) -> bool {
    Uuid::parse_str(src).is_ok()
}
