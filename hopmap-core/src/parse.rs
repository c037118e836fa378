//! Line parsers for traceroute output.
//!
//! Parsing is best-effort per line: headers, blank lines and rows where every
//! reply timed out all yield `None`.

use std::sync::LazyLock;

use regex::Regex;

use crate::Hop;

static UNIX_ALL_TIMEOUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s+\*\s+\*\s+\*").expect("valid regex"));

static UNIX_HOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d+)\s+(?:(\S+)\s+)?\((\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\)\s+(\*|\d+\.?\d*)\s+ms\s+(\*|\d+\.?\d*)\s+ms\s+(\*|\d+\.?\d*)\s+ms",
    )
    .expect("valid regex")
});

static WINDOWS_HOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s+(\*|\d+)\s+ms\s+(\*|\d+)\s+ms\s+(\*|\d+)\s+ms\s+(.+)$")
        .expect("valid regex")
});

static BRACKETED_IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[?(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\]?").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFormat {
    /// `traceroute`: `<hop> [host] (<ipv4>) <r1> ms <r2> ms <r3> ms`
    Unix,
    /// `tracert`: `<hop> <r1> ms <r2> ms <r3> ms <host-or-[ipv4]>`, integer replies only
    Windows,
}

impl ProbeFormat {
    pub fn native() -> Self {
        if cfg!(windows) {
            ProbeFormat::Windows
        } else {
            ProbeFormat::Unix
        }
    }

    pub fn parse_line(self, line: &str) -> Option<Hop> {
        match self {
            ProbeFormat::Unix => parse_unix_line(line),
            ProbeFormat::Windows => parse_windows_line(line),
        }
    }

    pub fn parse_output<'a, I>(self, lines: I) -> Vec<Hop>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .filter_map(|line| self.parse_line(line))
            .collect()
    }
}

pub fn parse_unix_line(line: &str) -> Option<Hop> {
    if UNIX_ALL_TIMEOUT.is_match(line) {
        return None;
    }
    let caps = UNIX_HOP.captures(line)?;
    let hop_number = caps[1].parse::<u32>().ok()?;
    let replies = [&caps[4], &caps[5], &caps[6]]
        .into_iter()
        .filter_map(|r| r.parse::<f64>().ok());
    Some(Hop {
        hop_number,
        address: caps[3].to_string(),
        latency_ms: min_reply_ms(replies),
    })
}

pub fn parse_windows_line(line: &str) -> Option<Hop> {
    let caps = WINDOWS_HOP.captures(line)?;
    let hop_number = caps[1].parse::<u32>().ok()?;
    let address = BRACKETED_IPV4.captures(caps[5].trim())?[1].to_string();
    let replies = [&caps[2], &caps[3], &caps[4]]
        .into_iter()
        .filter_map(|r| r.parse::<u32>().ok())
        .map(f64::from);
    Some(Hop {
        hop_number,
        address,
        latency_ms: min_reply_ms(replies),
    })
}

// Smallest numeric reply, ties rounded to even.
fn min_reply_ms<I: Iterator<Item = f64>>(replies: I) -> Option<u32> {
    replies
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
        .min_by(|a, b| a.total_cmp(b))
        .map(|ms| ms.round_ties_even() as u32)
}
