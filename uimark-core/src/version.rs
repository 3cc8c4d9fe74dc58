use std::fmt;

/// Integers are positional regenerations; `base.step` labels are edits and
/// steps count as integers (`0.9` -> `0.10`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionLabel {
    Generation(u32),
    Edit { base: u32, step: u32 },
    Opaque(String),
}

impl VersionLabel {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some((base, step)) = trimmed.split_once('.') {
            if let (Some(base), Some(step)) = (parse_digits(base), parse_digits(step)) {
                return Self::Edit { base, step };
            }
            return Self::Opaque(trimmed.to_string());
        }

        match parse_digits(trimmed) {
            Some(value) => Self::Generation(value),
            None => Self::Opaque(trimmed.to_string()),
        }
    }

    pub fn is_edit(&self) -> bool {
        match self {
            Self::Generation(_) => false,
            Self::Edit { .. } => true,
            Self::Opaque(raw) => raw.contains('.'),
        }
    }

    pub fn next_edit(&self) -> Option<Self> {
        match self {
            Self::Generation(base) => Some(Self::Edit {
                base: *base,
                step: 1,
            }),
            Self::Edit { base, step } => Some(Self::Edit {
                base: *base,
                step: step.saturating_add(1),
            }),
            Self::Opaque(_) => None,
        }
    }

    pub fn edit_key(&self) -> Option<(u32, u32)> {
        match self {
            Self::Edit { base, step } => Some((*base, *step)),
            _ => None,
        }
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation(value) => write!(f, "{value}"),
            Self::Edit { base, step } => write!(f, "{base}.{step}"),
            Self::Opaque(raw) => write!(f, "{raw}"),
        }
    }
}

fn parse_digits(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
