//! Typed callback actions.
//!
//! Inline-keyboard buttons carry a pipe-delimited payload. It is decoded into
//! an `Action` exactly once, at the boundary; the flow matches on the variant
//! and never touches raw strings. Encoding produces the same grammar for the
//! buttons the flow renders.
//!
//! Grammar (integers base-10, flags `0`/`1`):
//!
//! ```text
//! D|idx              select item
//! C|idx|milk         milk choice
//! B|idx|milk|cup     cup choice
//! Y|idx|milk|cup     confirm
//! N|idx              cancel
//! ```

/// One decoded callback action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SelectItem { item: usize },
    MilkChoice { item: usize, milk: bool },
    CupChoice { item: usize, milk: bool, cup: bool },
    Confirm { item: usize, milk: bool, cup: bool },
    Cancel { item: usize },
}

impl Action {
    /// Decode a callback payload. Returns `None` for anything malformed:
    /// unknown prefix, wrong field count, non-numeric index, non-`0`/`1` flag.
    pub fn parse(data: &str) -> Option<Action> {
        let mut parts = data.split('|');
        let prefix = parts.next()?;
        let fields: Vec<&str> = parts.collect();

        match (prefix, fields.as_slice()) {
            ("D", [idx]) => Some(Action::SelectItem {
                item: parse_index(idx)?,
            }),
            ("C", [idx, milk]) => Some(Action::MilkChoice {
                item: parse_index(idx)?,
                milk: parse_flag(milk)?,
            }),
            ("B", [idx, milk, cup]) => Some(Action::CupChoice {
                item: parse_index(idx)?,
                milk: parse_flag(milk)?,
                cup: parse_flag(cup)?,
            }),
            ("Y", [idx, milk, cup]) => Some(Action::Confirm {
                item: parse_index(idx)?,
                milk: parse_flag(milk)?,
                cup: parse_flag(cup)?,
            }),
            ("N", [idx]) => Some(Action::Cancel {
                item: parse_index(idx)?,
            }),
            _ => None,
        }
    }

    /// Encode back into the callback payload grammar.
    pub fn encode(&self) -> String {
        match *self {
            Action::SelectItem { item } => format!("D|{}", item),
            Action::MilkChoice { item, milk } => format!("C|{}|{}", item, flag(milk)),
            Action::CupChoice { item, milk, cup } => {
                format!("B|{}|{}|{}", item, flag(milk), flag(cup))
            }
            Action::Confirm { item, milk, cup } => {
                format!("Y|{}|{}|{}", item, flag(milk), flag(cup))
            }
            Action::Cancel { item } => format!("N|{}", item),
        }
    }
}

fn parse_index(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

fn flag(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}
