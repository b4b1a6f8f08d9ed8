use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "POSGUARD_PASSWORD";

/// Reads a password to verify.
pub fn read_password() -> Result<Zeroizing<String>> {
    //  POSGUARD_PASSWORD="supersecret" posguard verify-password
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    //  printf "%s" "$PW" | posguard verify-password
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
        bail!("No password provided")
    }

    let pw = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if pw.is_empty() {
        bail!("No password provided")
    }
    Ok(pw)
}

/// Reads a password to hash. On a terminal it must be typed twice.
pub fn read_new_password_with_confirmation() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    if !io::stdin().is_terminal() {
        let stdin = io::stdin();
        let mut handle = stdin.lock();

        let mut pw = Zeroizing::new(String::new());
        handle.read_line(&mut pw)?;
        trim_newline(&mut pw);

        if pw.is_empty() {
            bail!("An empty-string password is not allowed");
        }
        return Ok(pw);
    }

    let pw1 = Zeroizing::new(rpassword::prompt_password("New password: ")?);
    let pw2 = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);

    if pw1.is_empty() {
        bail!("An empty-string password is not allowed");
    }

    if pw1 != pw2 {
        bail!("passwords do not match");
    }

    Ok(pw1)
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
