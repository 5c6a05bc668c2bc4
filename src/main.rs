// Entrypoint for diffshare.
// - Prepares the config directory, builds the session and hands it to the
//   UI loop.
// - Startup failures (no git, unreadable token) are returned through
//   `anyhow` before any UI is shown.

use std::sync::Arc;

use anyhow::Context;
use diffshare::api::device::DeviceFlow;
use diffshare::api::gist::GistClient;
use diffshare::clipboard::SystemClipboard;
use diffshare::session::{Services, Session};
use diffshare::store::TokenFile;
use diffshare::{config, logging, ui};

fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let dir = config::config_dir()?;
    config::ensure_config_dir(&dir)?;

    let services = Services {
        authorizer: Arc::new(DeviceFlow::github().context("Failed to build HTTP client")?),
        uploader: Arc::new(GistClient::github().context("Failed to build HTTP client")?),
        store: Arc::new(TokenFile::new(config::token_path(&dir))),
        clipboard: Box::new(SystemClipboard::new()),
    };

    let mut session = Session::construct(services)?;
    ui::run(&mut session)?;

    let outcome = session
        .outcome()
        .context("session stopped without a result")?;
    println!("{}", ui::styled_result(outcome));

    let code = outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
