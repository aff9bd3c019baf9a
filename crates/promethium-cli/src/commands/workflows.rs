//! `promethium workflows ...`

use anyhow::Result;
use console::style;
use serde_json::json;

use promethium::{ListWorkflowParams, PromethiumClient, WorkflowId};

use super::common::{load_request, print_json, wait_for, write_results_zip};
use crate::cli::WorkflowCommand;

/// Execute a workflows subcommand.
pub async fn execute(client: &PromethiumClient, command: WorkflowCommand) -> Result<()> {
    let workflows = client.workflows();
    match command {
        WorkflowCommand::List {
            kind,
            search,
            status,
            page,
            size,
        } => {
            let params = ListWorkflowParams {
                kind,
                search,
                status,
                page: Some(page),
                size,
            };
            print_json(&workflows.list(&params).await?)
        }

        WorkflowCommand::New {
            input_file,
            wait,
            output_dir,
        } => {
            let request = load_request(&input_file)?;
            let workflow = workflows.submit(&request).await?;
            eprintln!(
                "{} Submitted {} workflow {}",
                style("→").cyan().bold(),
                workflow.kind,
                style(&workflow.id).green()
            );
            if !wait.wait {
                return print_json(&workflow);
            }

            wait_for(client, &workflow.id, &wait).await?;
            match output_dir {
                Some(dir) => {
                    let bytes = workflows.download(&workflow.id).await?;
                    let path = write_results_zip(&dir, &workflow.id, &bytes)?;
                    eprintln!("{} Saved {}", style("✓").green().bold(), path.display());
                    Ok(())
                }
                None => print_json(&workflows.results(&workflow.id).await?),
            }
        }

        WorkflowCommand::Results { id, wait } => {
            let id = WorkflowId::new(id);
            if wait.wait {
                wait_for(client, &id, &wait).await?;
            }
            print_json(&workflows.results(&id).await?)
        }

        WorkflowCommand::Download {
            id,
            wait,
            output_dir,
        } => {
            let id = WorkflowId::new(id);
            if wait.wait {
                wait_for(client, &id, &wait).await?;
            }
            let bytes = workflows.download(&id).await?;
            let path = write_results_zip(&output_dir, &id, &bytes)?;
            eprintln!("{} Saved {}", style("✓").green().bold(), path.display());
            Ok(())
        }

        WorkflowCommand::Status { id } => {
            let status = workflows.status(&WorkflowId::new(id)).await?;
            print_json(&json!({ "status": status.as_str() }))
        }

        WorkflowCommand::Read { id } => print_json(&workflows.get(&WorkflowId::new(id)).await?),

        WorkflowCommand::Stop { id } => {
            workflows.stop(&WorkflowId::new(&*id)).await?;
            eprintln!("{} Stopped {}", style("✓").green().bold(), id);
            Ok(())
        }

        WorkflowCommand::Delete { id } => {
            workflows.delete(&WorkflowId::new(&*id)).await?;
            eprintln!("{} Deleted {}", style("✓").green().bold(), id);
            Ok(())
        }

        WorkflowCommand::Memory { input_file } => {
            let request = load_request(&input_file)?;
            let estimate = workflows.memory(&request).await?;
            eprintln!(
                "{} Estimated peak memory: {:.2} GB",
                style("→").cyan().bold(),
                estimate.prediction_gb()
            );
            print_json(&estimate)
        }
    }
}
