//! Shared fixtures for unit tests.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::format::Row;

pub(crate) const HEADERS: [&str; 9] = [
    "taxonID",
    "scientificName",
    "kingdom",
    "phylum",
    "class",
    "order",
    "family",
    "genus",
    "nomenclaturalCode",
];

pub(crate) const ROWS: [[&str; 9]; 10] = [
    [
        "2",
        "Nothocercus bonapartei",
        "Animalia",
        "Chordata",
        "Aves",
        "Tinamiformes",
        "Tinamidae",
        "Nothocercus",
        "ICZN",
    ],
    [
        "1",
        "Tinamus major",
        "Animalia",
        "Chordata",
        "Aves",
        "Tinamiformes",
        "Tinamidae",
        "Tinamus",
        "ICZN",
    ],
    [
        "3",
        "Crypturellus soui",
        "Animalia",
        "Chordata",
        "Aves",
        "Tinamiformes",
        "Tinamidae",
        "Crypturellus",
        "ICZN",
    ],
    [
        "4",
        "Crypturellus cinnamomeus",
        "Animalia",
        "Chordata",
        "Aves",
        "Tinamiformes",
        "Tinamidae",
        "Crypturellus",
        "ICZN",
    ],
    [
        "5",
        "Crypturellus boucardi",
        "Animalia",
        "Chordata",
        "Aves",
        "Tinamiformes",
        "Tinamidae",
        "Crypturellus",
        "ICZN",
    ],
    [
        "6",
        "Crypturellus kerriae",
        "Animalia",
        "Chordata",
        "Aves",
        "Tinamiformes",
        "Tinamidae",
        "Crypturellus",
        "ICZN",
    ],
    [
        "7",
        "Dendrocygna viduata",
        "Animalia",
        "Chordata",
        "Aves",
        "Anseriformes",
        "Anatidae",
        "Dendrocygna",
        "ICZN",
    ],
    [
        "8",
        "Dendrocygna autumnalis",
        "Animalia",
        "Chordata",
        "Aves",
        "Anseriformes",
        "Anatidae",
        "Dendrocygna",
        "ICZN",
    ],
    [
        "9",
        "Dendrocygna arborea",
        "Animalia",
        "Chordata",
        "Aves",
        "Anseriformes",
        "Anatidae",
        "Dendrocygna",
        "ICZN",
    ],
    [
        "10",
        "Dendrocygna bicolor",
        "Animalia",
        "Chordata",
        "Aves",
        "Anseriformes",
        "Anatidae",
        "Dendrocygna",
        "ICZN",
    ],
];

/// Index of the data row that is malformed in the `*Less` / `*More` fixtures.
pub(crate) const BAD_ROW: usize = 3;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Fixture {
    CommaNorm,
    TabNorm,
    PipeNorm,
    CommaLess,
    CommaMore,
    TabLess,
    TabMore,
    CommaQuoted,
    CommaNoHeaders,
    TabWithQuotes,
}

impl Fixture {
    fn file_name(self) -> &'static str {
        match self {
            Fixture::CommaNorm => "comma-norm.csv",
            Fixture::TabNorm => "tab-norm.csv",
            Fixture::PipeNorm => "pipe-norm.csv",
            Fixture::CommaLess => "comma-less.csv",
            Fixture::CommaMore => "comma-more.csv",
            Fixture::TabLess => "tab-less.csv",
            Fixture::TabMore => "tab-more.csv",
            Fixture::CommaQuoted => "comma-quoted.csv",
            Fixture::CommaNoHeaders => "comma-no-headers.csv",
            Fixture::TabWithQuotes => "tab-w-quotes.csv",
        }
    }

    fn content(self) -> String {
        match self {
            Fixture::CommaNorm => delimited(',', true, None),
            Fixture::TabNorm => delimited('\t', true, None),
            Fixture::PipeNorm => delimited('|', true, None),
            Fixture::CommaLess => delimited(',', true, Some(Shape::Less)),
            Fixture::CommaMore => delimited(',', true, Some(Shape::More)),
            Fixture::TabLess => delimited('\t', true, Some(Shape::Less)),
            Fixture::TabMore => delimited('\t', true, Some(Shape::More)),
            Fixture::CommaNoHeaders => delimited(',', false, None),
            Fixture::CommaQuoted => {
                let mut out = String::new();
                for line in std::iter::once(HEADERS).chain(ROWS) {
                    let quoted: Vec<String> = line.iter().map(|f| format!("\"{}\"", f)).collect();
                    out.push_str(&quoted.join(","));
                    out.push('\n');
                }
                out
            }
            Fixture::TabWithQuotes => {
                // Each scientific name carries a quoted tab.
                let mut out = HEADERS.join("\t");
                out.push('\n');
                for row in ROWS {
                    let mut fields: Vec<String> = row.iter().map(|f| f.to_string()).collect();
                    fields[1] = format!("\"{}\"", fields[1].replacen(' ', "\t", 1));
                    out.push_str(&fields.join("\t"));
                    out.push('\n');
                }
                out
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Shape {
    Less,
    More,
}

fn delimited(sep: char, with_header: bool, bad: Option<Shape>) -> String {
    let sep = sep.to_string();
    let mut out = String::new();
    if with_header {
        out.push_str(&HEADERS.join(&sep));
        out.push('\n');
    }
    for (i, row) in ROWS.iter().enumerate() {
        let mut fields: Vec<&str> = row.to_vec();
        if i == BAD_ROW {
            match bad {
                Some(Shape::Less) => {
                    fields.pop();
                }
                Some(Shape::More) => fields.push("extra"),
                None => {}
            }
        }
        out.push_str(&fields.join(&sep));
        out.push('\n');
    }
    out
}

/// Writes `fixture` into `dir` and returns its path.
pub(crate) fn write_fixture(dir: &TempDir, fixture: Fixture) -> PathBuf {
    let path = dir.path().join(fixture.file_name());
    fs::write(&path, fixture.content()).expect("Failed to write fixture");
    path
}

/// The fixture data rows as owned rows.
pub(crate) fn rows() -> Vec<Row> {
    ROWS.iter()
        .map(|row| row.iter().map(|f| f.to_string()).collect())
        .collect()
}

pub(crate) fn to_rows(data: &[&[&str]]) -> Vec<Row> {
    data.iter()
        .map(|row| row.iter().map(|f| f.to_string()).collect())
        .collect()
}
