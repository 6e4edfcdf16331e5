//! ntty daemon - broadcast stdin lines to every connected TCP client.
//!
//! See `nttyd --help` for options.

fn main() -> anyhow::Result<()> {
    nttyd::cli::run()
}
