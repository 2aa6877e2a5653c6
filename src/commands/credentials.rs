use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::error::{Error, Result};
use crate::security::auth::Credentials;

/// Environment credentials when both variables are set, otherwise an
/// interactive prompt with hidden password input.
pub fn resolve() -> Result<Credentials> {
    if let Some(creds) = Credentials::from_env() {
        debug!("using credentials from environment");
        return creds;
    }
    prompt(&mut io::stdin().lock(), &mut io::stderr())
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Credentials> {
    let io_err = |e: io::Error| Error::Credentials(format!("reading credentials: {e}"));

    write!(out, "*** Enter Your HubID : ").map_err(io_err)?;
    out.flush().map_err(io_err)?;
    let mut username = String::new();
    input.read_line(&mut username).map_err(io_err)?;

    let password = rpassword::prompt_password("*** Enter Password: ").map_err(io_err)?;
    Credentials::new(username.trim(), password)
}
