use anyhow::Result;
use chartops_server::AppState;
use std::path::Path;

pub fn run(root: &Path, port: u16) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let state = AppState::from_root(root.to_path_buf())?;

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        let actual_port = listener.local_addr()?.port();
        println!("chartops API for {} at http://localhost:{actual_port}", root.display());

        tokio::select! {
            res = chartops_server::serve_on(state, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
