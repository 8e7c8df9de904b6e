//! Text form of item and folder records.
//!
//! The layout is the grid's brace-delimited inventory block format:
//!
//! ```text
//! inv_item	0
//! {
//! 	item_id	6a1d...
//! 	permissions	0
//! 	{
//! 		base_mask	7fffffff
//! 		...
//! 	}
//! 	name	Jimmy Jimmy|
//! }
//! ```
//!
//! Each line is a key and a value separated by one tab (or space). String
//! values are escaped and terminated by `|`. Unknown keys are ignored on
//! parse. Folder blocks do not carry `descendent_count`.

use std::fmt::{self, Write as _};
use std::iter::Peekable;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::codes::{AssetType, InventoryType, SaleType};
use crate::error::TypeError;
use crate::id::InventoryId;
use crate::permissions::{PermissionMask, Permissions};
use crate::record::{FolderRecord, InventoryRecord, ItemRecord};

const ITEM_HEADER: &str = "inv_item";
const FOLDER_HEADER: &str = "inv_category";

impl fmt::Display for ItemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.permissions;
        writeln!(f, "{ITEM_HEADER}\t0")?;
        writeln!(f, "{{")?;
        writeln!(f, "\titem_id\t{}", self.id)?;
        writeln!(f, "\tparent_id\t{}", self.parent_id)?;
        writeln!(f, "\tpermissions\t0")?;
        writeln!(f, "\t{{")?;
        writeln!(f, "\t\tbase_mask\t{:08x}", p.base_mask)?;
        writeln!(f, "\t\towner_mask\t{:08x}", p.owner_mask)?;
        writeln!(f, "\t\tgroup_mask\t{:08x}", p.group_mask)?;
        writeln!(f, "\t\teveryone_mask\t{:08x}", p.everyone_mask)?;
        writeln!(f, "\t\tnext_owner_mask\t{:08x}", p.next_owner_mask)?;
        writeln!(f, "\t\tcreator_id\t{}", self.creator_id)?;
        writeln!(f, "\t\towner_id\t{}", self.owner_id)?;
        writeln!(f, "\t\tgroup_id\t{}", self.group_id)?;
        writeln!(f, "\t\tgroup_owned\t{}", u8::from(self.group_owned))?;
        writeln!(f, "\t}}")?;
        writeln!(f, "\tasset_id\t{}", self.asset_id)?;
        writeln!(f, "\ttype\t{}", self.asset_type)?;
        writeln!(f, "\tinv_type\t{}", self.inventory_type)?;
        writeln!(f, "\tflags\t{:08x}", self.flags)?;
        writeln!(f, "\tsale_info\t0")?;
        writeln!(f, "\t{{")?;
        writeln!(f, "\t\tsale_type\t{}", self.sale_type)?;
        writeln!(f, "\t\tsale_price\t{}", self.sale_price)?;
        writeln!(f, "\t}}")?;
        writeln!(f, "\tname\t{}|", escape(&self.name))?;
        writeln!(f, "\tdesc\t{}|", escape(&self.description))?;
        writeln!(f, "\tcreation_date\t{}", render_date(&self.creation_date))?;
        writeln!(f, "}}")
    }
}

impl fmt::Display for FolderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{FOLDER_HEADER}\t0")?;
        writeln!(f, "{{")?;
        writeln!(f, "\tcat_id\t{}", self.id)?;
        writeln!(f, "\tparent_id\t{}", self.parent_id)?;
        writeln!(f, "\ttype\t{}", AssetType::Folder)?;
        writeln!(f, "\tpref_type\t{}", self.preferred_type)?;
        writeln!(f, "\tname\t{}|", escape(&self.name))?;
        writeln!(f, "\towner_id\t{}", self.owner_id)?;
        writeln!(f, "\tversion\t{}", self.version)?;
        writeln!(f, "}}")
    }
}

impl fmt::Display for InventoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(r) => r.fmt(f),
            Self::Folder(r) => r.fmt(f),
        }
    }
}

impl FromStr for ItemRecord {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<InventoryRecord>()? {
            InventoryRecord::Item(item) => Ok(item),
            InventoryRecord::Folder(_) => Err(TypeError::Malformed {
                line: 1,
                reason: format!("expected {ITEM_HEADER}, found {FOLDER_HEADER}"),
            }),
        }
    }
}

impl FromStr for FolderRecord {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<InventoryRecord>()? {
            InventoryRecord::Folder(folder) => Ok(folder),
            InventoryRecord::Item(_) => Err(TypeError::Malformed {
                line: 1,
                reason: format!("expected {FOLDER_HEADER}, found {ITEM_HEADER}"),
            }),
        }
    }
}

impl FromStr for InventoryRecord {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = tokenize(s).peekable();
        let (line, header, _) = lines.next().ok_or(TypeError::Malformed {
            line: 0,
            reason: "empty input".into(),
        })?;
        let block = parse_block(&mut lines, line)?;
        match header {
            ITEM_HEADER => item_from_block(&block).map(InventoryRecord::Item),
            FOLDER_HEADER => folder_from_block(&block).map(InventoryRecord::Folder),
            other => Err(TypeError::Malformed {
                line,
                reason: format!("unrecognized block header: {other}"),
            }),
        }
    }
}

/// Parse every record block in `s`, in order.
pub fn parse_records(s: &str) -> Result<Vec<InventoryRecord>, TypeError> {
    let mut lines = tokenize(s).peekable();
    let mut records = Vec::new();
    while let Some((line, header, _)) = lines.next() {
        let block = parse_block(&mut lines, line)?;
        let record = match header {
            ITEM_HEADER => InventoryRecord::Item(item_from_block(&block)?),
            FOLDER_HEADER => InventoryRecord::Folder(folder_from_block(&block)?),
            other => {
                return Err(TypeError::Malformed {
                    line,
                    reason: format!("unrecognized block header: {other}"),
                })
            }
        };
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------
// Tokenizer and block tree
// ---------------------------------------------------------------

/// One non-empty line split into key and raw value.
type Line<'a> = (usize, &'a str, &'a str);

fn tokenize(s: &str) -> impl Iterator<Item = Line<'_>> {
    s.split('\n').enumerate().filter_map(|(idx, raw)| {
        let line = raw.strip_suffix('\r').unwrap_or(raw).trim_start();
        if line.trim_end().is_empty() {
            return None;
        }
        let (key, value) = match line.find(['\t', ' ']) {
            Some(pos) => (&line[..pos], &line[pos + 1..]),
            None => (line, ""),
        };
        Some((idx + 1, key, value))
    })
}

#[derive(Debug, Default)]
struct Block<'a> {
    fields: Vec<(&'a str, &'a str)>,
    children: Vec<(&'a str, Block<'a>)>,
}

impl<'a> Block<'a> {
    fn get(&self, key: &str) -> Option<&'a str> {
        self.fields.iter().rev().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    fn child(&self, key: &str) -> Option<&Block<'a>> {
        self.children.iter().rev().find(|(k, _)| *k == key).map(|(_, b)| b)
    }
}

/// Parse a `{ ... }` body. The opening brace must be the next line.
fn parse_block<'a, I>(lines: &mut Peekable<I>, header_line: usize) -> Result<Block<'a>, TypeError>
where
    I: Iterator<Item = Line<'a>>,
{
    match lines.next() {
        Some((_, "{", _)) => {}
        Some((line, key, _)) => {
            return Err(TypeError::Malformed {
                line,
                reason: format!("expected '{{', found {key}"),
            })
        }
        None => {
            return Err(TypeError::Malformed {
                line: header_line,
                reason: "missing block body".into(),
            })
        }
    }

    let mut block = Block::default();
    while let Some((line, key, value)) = lines.next() {
        if key == "}" {
            return Ok(block);
        }
        if matches!(lines.peek(), Some((_, "{", _))) {
            let child = parse_block(lines, line)?;
            block.children.push((key, child));
        } else {
            block.fields.push((key, value));
        }
    }
    Err(TypeError::Malformed {
        line: header_line,
        reason: "unterminated block".into(),
    })
}

// ---------------------------------------------------------------
// Field decoding
// ---------------------------------------------------------------

fn item_from_block(block: &Block<'_>) -> Result<ItemRecord, TypeError> {
    let mut item = ItemRecord::new(required_id(block, "item_id")?);
    item.parent_id = opt_id(block.get("parent_id"))?;

    if let Some(perms) = block.child("permissions") {
        item.permissions = Permissions {
            base_mask: opt_mask(perms.get("base_mask"), "base_mask")?,
            owner_mask: opt_mask(perms.get("owner_mask"), "owner_mask")?,
            group_mask: opt_mask(perms.get("group_mask"), "group_mask")?,
            everyone_mask: opt_mask(perms.get("everyone_mask"), "everyone_mask")?,
            next_owner_mask: opt_mask(perms.get("next_owner_mask"), "next_owner_mask")?,
        };
        item.creator_id = opt_id(perms.get("creator_id"))?;
        item.owner_id = opt_id(perms.get("owner_id"))?;
        item.group_id = opt_id(perms.get("group_id"))?;
        item.group_owned = match perms.get("group_owned").map(str::trim) {
            None | Some("0") => false,
            Some("1") => true,
            Some(other) => {
                return Err(TypeError::InvalidValue {
                    field: "group_owned",
                    value: other.to_string(),
                })
            }
        };
    }

    if let Some(sale) = block.child("sale_info") {
        if let Some(v) = sale.get("sale_type") {
            item.sale_type = SaleType::from_name(v.trim())?;
        }
        if let Some(v) = sale.get("sale_price") {
            item.sale_price = parse_num(v, "sale_price")?;
        }
    }

    item.asset_id = opt_id(block.get("asset_id"))?;
    if let Some(v) = block.get("type") {
        item.asset_type = AssetType::from_name(v.trim())?;
    }
    if let Some(v) = block.get("inv_type") {
        item.inventory_type = InventoryType::from_name(v.trim())?;
    }
    if let Some(v) = block.get("flags") {
        item.flags = parse_hex(v, "flags")?;
    }
    if let Some(v) = block.get("name") {
        item.name = terminated(v, "name")?;
    }
    if let Some(v) = block.get("desc") {
        item.description = terminated(v, "desc")?;
    }
    if let Some(v) = block.get("creation_date") {
        item.creation_date = parse_date(v)?;
    }
    Ok(item)
}

fn folder_from_block(block: &Block<'_>) -> Result<FolderRecord, TypeError> {
    let mut folder = FolderRecord::new(required_id(block, "cat_id")?);
    folder.parent_id = opt_id(block.get("parent_id"))?;
    folder.owner_id = opt_id(block.get("owner_id"))?;
    if let Some(v) = block.get("pref_type") {
        folder.preferred_type = AssetType::from_name(v.trim())?;
    }
    if let Some(v) = block.get("name") {
        folder.name = terminated(v, "name")?;
    }
    if let Some(v) = block.get("version") {
        folder.version = parse_num(v, "version")?;
    }
    Ok(folder)
}

fn required_id(block: &Block<'_>, key: &'static str) -> Result<InventoryId, TypeError> {
    let raw = block.get(key).ok_or(TypeError::MissingField(key))?;
    InventoryId::parse_str(raw)
}

fn opt_id(raw: Option<&str>) -> Result<InventoryId, TypeError> {
    raw.map_or(Ok(InventoryId::nil()), InventoryId::parse_str)
}

fn opt_mask(raw: Option<&str>, field: &'static str) -> Result<PermissionMask, TypeError> {
    raw.map_or(Ok(PermissionMask::NONE), |v| parse_hex(v, field).map(PermissionMask))
}

fn parse_hex(raw: &str, field: &'static str) -> Result<u32, TypeError> {
    u32::from_str_radix(raw.trim(), 16).map_err(|_| TypeError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

fn parse_num<T: FromStr>(raw: &str, field: &'static str) -> Result<T, TypeError> {
    raw.trim().parse().map_err(|_| TypeError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

/// Unix seconds, with a nine-digit nanosecond fraction when it is non-zero.
/// The fraction is added to the whole seconds, including before the epoch.
fn render_date(date: &DateTime<Utc>) -> String {
    match date.timestamp_subsec_nanos() {
        0 => date.timestamp().to_string(),
        nanos => format!("{}.{nanos:09}", date.timestamp()),
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, TypeError> {
    let raw = raw.trim();
    let invalid = || TypeError::InvalidValue {
        field: "creation_date",
        value: raw.to_string(),
    };
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if let Ok(secs) = whole.parse::<i64>() {
        if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let nanos = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<9}").parse::<u32>().map_err(|_| invalid())?
        };
        return DateTime::from_timestamp(secs, nanos).ok_or_else(invalid);
    }
    // Some tools write RFC 3339 instead.
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid())
}

/// Strip the `|` terminator and undo escaping.
fn terminated(raw: &str, field: &'static str) -> Result<String, TypeError> {
    let body = raw.strip_suffix('|').ok_or(TypeError::InvalidValue {
        field,
        value: raw.to_string(),
    })?;
    unescape(body).ok_or(TypeError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\|"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            '|' => out.push('|'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            other => {
                let _ = write!(out, "\\{other}");
            }
        }
    }
    Some(out)
}
