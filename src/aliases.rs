//! Static alias table. Expansion rewrites argv before clap sees it and
//! touches nothing else.

/// Subcommands that an alias may stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonical {
    Shell,
    Status,
}

impl Canonical {
    pub fn name(self) -> &'static str {
        match self {
            Canonical::Shell => "shell",
            Canonical::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    pub name: &'static str,
    pub canonical: Canonical,
    /// Arguments inserted right after the canonical name.
    pub template: &'static [&'static str],
}

pub static ALIASES: &[Alias] = &[
    Alias {
        name: "bash",
        canonical: Canonical::Shell,
        template: &["--type=bash"],
    },
    Alias {
        name: "sh",
        canonical: Canonical::Shell,
        template: &[],
    },
    Alias {
        name: "ps",
        canonical: Canonical::Status,
        template: &[],
    },
];

/// Global flags that consume the following token as their value.
const VALUE_FLAGS: &[&str] = &["--config-dir", "--engine"];

pub fn lookup(name: &str) -> Option<&'static Alias> {
    ALIASES.iter().find(|alias| alias.name == name)
}

/// Replaces an alias in subcommand position with its canonical form.
/// `argv[0]` is the program name and is kept as is.
pub fn expand(argv: Vec<String>) -> Vec<String> {
    let Some(position) = subcommand_position(&argv) else {
        return argv;
    };
    let Some(alias) = lookup(&argv[position]) else {
        return argv;
    };

    let mut expanded = Vec::with_capacity(argv.len() + alias.template.len());
    expanded.extend_from_slice(&argv[..position]);
    expanded.push(alias.canonical.name().to_string());
    expanded.extend(alias.template.iter().map(|arg| arg.to_string()));
    expanded.extend_from_slice(&argv[position + 1..]);
    expanded
}

/// Index of the first token that is not a leading global flag.
fn subcommand_position(argv: &[String]) -> Option<usize> {
    let mut i = 1;
    while i < argv.len() {
        let token = argv[i].as_str();
        if VALUE_FLAGS.contains(&token) {
            i += 2;
        } else if token.starts_with('-') {
            i += 1;
        } else {
            return Some(i);
        }
    }
    None
}
