//! Payload (de)serialization of GlobalState tables.
//!
//! A payload is a prebuilt GlobalState (typically the standard library's
//! names and symbols) stored as a versioned JSON document. Member maps and
//! lookup indices are not stored; loading rebuilds them from the entries, so
//! a loaded state behaves exactly like one built by interning.

use crate::files::{File, FileTable};
use crate::global_state::GlobalState;
use crate::names::{NameData, NameTable};
use crate::symbols::{Symbol, SymbolKind, SymbolTable};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Bumped whenever the stored layout of any table entry changes.
pub const PAYLOAD_VERSION: u32 = 1;

/// Why a payload was rejected.
#[derive(Debug)]
pub enum PayloadError {
    /// The bytes are not a payload document.
    Malformed(serde_json::Error),
    VersionMismatch {
        expected: u32,
        found: u32,
    },
    /// A table has fewer entries than `init_empty` would have produced.
    MissingBootstrap {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    /// An entry refers to a handle that is out of range or not yet defined.
    DanglingReference {
        table: &'static str,
        index: usize,
        reference: u32,
    },
    /// An entry is well-formed but violates a table invariant.
    KindMismatch {
        table: &'static str,
        index: usize,
        detail: String,
    },
    /// Two entries share the identity that interning keeps unique.
    DuplicateEntry {
        table: &'static str,
        index: usize,
        first: usize,
    },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Malformed(err) => write!(f, "malformed payload: {err}"),
            PayloadError::VersionMismatch { expected, found } => {
                write!(f, "payload version {found} is not supported (expected {expected})")
            }
            PayloadError::MissingBootstrap {
                table,
                expected,
                found,
            } => write!(
                f,
                "{table} table has {found} entries, fewer than the {expected} bootstrap entries"
            ),
            PayloadError::DanglingReference {
                table,
                index,
                reference,
            } => write!(f, "{table} entry {index} refers to missing entry {reference}"),
            PayloadError::KindMismatch {
                table,
                index,
                detail,
            } => write!(f, "{table} entry {index}: {detail}"),
            PayloadError::DuplicateEntry {
                table,
                index,
                first,
            } => write!(f, "{table} entry {index} duplicates entry {first}"),
        }
    }
}

impl std::error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PayloadError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        PayloadError::Malformed(err)
    }
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    version: u32,
    names: &'a [NameData],
    symbols: &'a [Symbol],
    files: &'a [File],
}

#[derive(Deserialize)]
struct PayloadHeader {
    version: u32,
}

#[derive(Deserialize)]
struct Payload {
    names: Vec<NameData>,
    symbols: Vec<Symbol>,
    files: Vec<File>,
}

/// Encode every table of `gs`.
pub fn store_global_state(gs: &GlobalState) -> Result<Vec<u8>, PayloadError> {
    let payload = PayloadRef {
        version: PAYLOAD_VERSION,
        names: gs.names().entries(),
        symbols: gs.symbols().entries(),
        files: gs.files().entries(),
    };
    let bytes = serde_json::to_vec(&payload)?;
    debug!(
        names = gs.names_used(),
        symbols = gs.symbols_used(),
        files = gs.files_used(),
        bytes = bytes.len(),
        "stored global state payload"
    );
    Ok(bytes)
}

/// Replace the (empty) tables of a freshly constructed `gs` with a payload's.
///
/// On error `gs` is left untouched.
pub fn load_global_state(gs: &mut GlobalState, bytes: &[u8]) -> Result<(), PayloadError> {
    assert!(
        !gs.is_initialized() && gs.symbols_used() == 0 && gs.files_used() == 0,
        "payloads can only be loaded into a freshly constructed GlobalState"
    );

    let header: PayloadHeader = serde_json::from_slice(bytes)?;
    if header.version != PAYLOAD_VERSION {
        return Err(PayloadError::VersionMismatch {
            expected: PAYLOAD_VERSION,
            found: header.version,
        });
    }
    let payload: Payload = serde_json::from_slice(bytes)?;

    if let Err(err) = validate_tables(&payload.names, &payload.symbols, &payload.files) {
        debug!(%err, "rejected global state payload");
        return Err(err);
    }

    debug!(
        names = payload.names.len(),
        symbols = payload.symbols.len(),
        files = payload.files.len(),
        "loaded global state payload"
    );
    gs.install_tables(
        NameTable::from_entries(payload.names),
        SymbolTable::from_entries(payload.symbols),
        FileTable::from_entries(payload.files),
    );
    Ok(())
}

/// Check the invariants interning maintains, for entries that did not come
/// from interning.
pub(crate) fn validate_tables(
    names: &[NameData],
    symbols: &[Symbol],
    files: &[File],
) -> Result<(), PayloadError> {
    let mut bootstrap = GlobalState::new();
    bootstrap.init_empty();

    validate_names(names, bootstrap.names().entries())?;
    validate_files(files)?;
    validate_symbols(symbols, bootstrap.symbols().entries(), names.len(), files.len())
}

fn check_bootstrap_len(table: &'static str, found: usize, expected: usize) -> Result<(), PayloadError> {
    if found < expected {
        return Err(PayloadError::MissingBootstrap {
            table,
            expected,
            found,
        });
    }
    Ok(())
}

fn validate_names(names: &[NameData], bootstrap: &[NameData]) -> Result<(), PayloadError> {
    const TABLE: &str = "names";
    check_bootstrap_len(TABLE, names.len(), bootstrap.len())?;

    let mut seen: FxHashSet<&NameData> = FxHashSet::default();
    for (index, data) in names.iter().enumerate() {
        if index < bootstrap.len() && *data != bootstrap[index] {
            return Err(PayloadError::KindMismatch {
                table: TABLE,
                index,
                detail: format!("expected bootstrap name {:?}, found {data:?}", bootstrap[index]),
            });
        }
        match data {
            NameData::Utf8(_) => {}
            NameData::Constant { original } | NameData::Unique { original, .. } => {
                if original.0 as usize >= index {
                    return Err(PayloadError::DanglingReference {
                        table: TABLE,
                        index,
                        reference: original.0,
                    });
                }
                if let NameData::Constant { .. } = data
                    && matches!(names[original.0 as usize], NameData::Constant { .. })
                {
                    return Err(PayloadError::KindMismatch {
                        table: TABLE,
                        index,
                        detail: "constant name wraps another constant name".to_string(),
                    });
                }
                if let NameData::Unique { num: 0, .. } = data {
                    return Err(PayloadError::KindMismatch {
                        table: TABLE,
                        index,
                        detail: "unique name numbered 0".to_string(),
                    });
                }
            }
        }
        if !seen.insert(data) {
            let first = names.iter().position(|other| other == data).unwrap_or(index);
            return Err(PayloadError::DuplicateEntry {
                table: TABLE,
                index,
                first,
            });
        }
    }
    Ok(())
}

fn validate_files(files: &[File]) -> Result<(), PayloadError> {
    const TABLE: &str = "files";
    check_bootstrap_len(TABLE, files.len(), 1)?;

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for (index, file) in files.iter().enumerate().skip(1) {
        if !seen.insert(file.path.as_str()) {
            let first = files
                .iter()
                .skip(1)
                .position(|other| other.path == file.path)
                .map_or(index, |pos| pos + 1);
            return Err(PayloadError::DuplicateEntry {
                table: TABLE,
                index,
                first,
            });
        }
    }
    Ok(())
}

fn validate_symbols(
    symbols: &[Symbol],
    bootstrap: &[Symbol],
    names_len: usize,
    files_len: usize,
) -> Result<(), PayloadError> {
    const TABLE: &str = "symbols";
    check_bootstrap_len(TABLE, symbols.len(), bootstrap.len())?;

    let dangling = |index: usize, reference: u32| PayloadError::DanglingReference {
        table: TABLE,
        index,
        reference,
    };
    let mismatch = |index: usize, detail: String| PayloadError::KindMismatch {
        table: TABLE,
        index,
        detail,
    };

    let mut identities = FxHashMap::default();
    for (index, sym) in symbols.iter().enumerate() {
        if let Some(expected) = bootstrap.get(index)
            && (sym.owner, sym.name, sym.kind) != (expected.owner, expected.name, expected.kind)
        {
            return Err(mismatch(index, "does not match the bootstrap symbol".to_string()));
        }
        if sym.name.0 as usize >= names_len {
            return Err(dangling(index, sym.name.0));
        }
        for loc in &sym.locs {
            if loc.file.0 as usize >= files_len {
                return Err(dangling(index, loc.file.0));
            }
        }
        for argument in &sym.arguments {
            if argument.name.0 as usize >= names_len {
                return Err(dangling(index, argument.name.0));
            }
        }
        if !sym.arguments.is_empty() && sym.kind != SymbolKind::Method {
            return Err(mismatch(index, format!("{} has method arguments", sym.kind.as_str())));
        }

        for &class in sym.superclass.exists().then_some(&sym.superclass).into_iter().chain(&sym.mixins) {
            let Some(target) = symbols.get(class.0 as usize) else {
                return Err(dangling(index, class.0));
            };
            if !sym.is_class() || !target.is_class() || class.0 as usize == index {
                return Err(mismatch(
                    index,
                    format!("invalid superclass or mixin {class:?} on a {}", sym.kind.as_str()),
                ));
            }
        }

        // The two sentinels have no owner.
        if index < 2 {
            continue;
        }
        if !sym.owner.exists() || sym.owner.0 as usize >= index {
            return Err(dangling(index, sym.owner.0));
        }
        let owner_kind = symbols[sym.owner.0 as usize].kind;
        if !owner_kind.can_own(sym.kind) {
            return Err(mismatch(
                index,
                format!("a {} cannot own a {}", owner_kind.as_str(), sym.kind.as_str()),
            ));
        }
        if let Some(first) = identities.insert((sym.owner, sym.name, sym.kind), index) {
            return Err(PayloadError::DuplicateEntry {
                table: TABLE,
                index,
                first,
            });
        }
    }
    Ok(())
}
