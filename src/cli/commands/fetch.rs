//! Fetch command - answer one request the way a controlled page would

use super::Workspace;
use crate::cli::args::FetchArgs;
use crate::controller::{CacheController, Served};
use crate::error::{PrecacheError, PrecacheResult};
use crate::network::{Network, OfflineNetwork};
use crate::request::Request;
use crate::ui::{self, UiContext};
use console::style;
use std::io::Write;
use std::sync::Arc;
use tokio::fs;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, ws: &Workspace) -> PrecacheResult<()> {
    // Body goes to stdout unless written to a file
    let ctx = UiContext::detect().with_quiet(args.output.is_none());

    let deployment = ws.deployment()?;
    let url = deployment
        .scope
        .join(&args.url)
        .map_err(|e| PrecacheError::url(&args.url, e))?;
    let request = Request::get(url).with_method(args.method);

    let network: Arc<dyn Network> = if args.offline {
        Arc::new(OfflineNetwork)
    } else {
        ws.network(&deployment)?
    };

    let controller = CacheController::new(deployment, Arc::new(ws.storage()), network);
    let served = controller.on_fetch(&request).await?;

    let mut head = Vec::new();
    if args.include {
        write_head(&mut head, &served);
    }

    match args.output {
        Some(path) => {
            let mut content = head;
            content.extend_from_slice(&served.response.body);
            fs::write(&path, &content)
                .await
                .map_err(|e| PrecacheError::io(format!("writing {}", path.display()), e))?;
            ui::step_ok_detail(
                &ctx,
                &format!(
                    "{} {} ({} bytes) from {}",
                    served.response.status,
                    served.response.url,
                    served.response.body.len(),
                    served.source
                ),
                &path.display().to_string(),
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&head)
                .and_then(|_| stdout.write_all(&served.response.body))
                .and_then(|_| stdout.flush())
                .map_err(|e| PrecacheError::io("writing response body", e))?;
            eprintln!(
                "{} {} {}",
                style(served.response.status).bold(),
                served.response.url,
                style(format!("(from {})", served.source)).dim()
            );
        }
    }

    Ok(())
}

fn write_head(out: &mut Vec<u8>, served: &Served) {
    out.extend_from_slice(format!("HTTP {}\r\n", served.response.status).as_bytes());
    for (name, value) in served.response.headers.iter() {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    out.extend_from_slice(format!("x-precache-source: {}\r\n\r\n", served.source).as_bytes());
}
