//! Markdown documentation of the canonical table.

use std::fmt::Write;

use crate::survivorship::{CANONICAL_FIELD_RULES, MergeRule};

struct FieldDoc {
    name: &'static str,
    ty: &'static str,
    nullable: bool,
    format: &'static str,
    example: &'static str,
}

const FIELDS: &[FieldDoc] = &[
    FieldDoc {
        name: "canonical_id",
        ty: "string",
        nullable: false,
        format: "ISBN-13 or `synth:` + 16 hex chars",
        example: "9781491901427",
    },
    FieldDoc {
        name: "synthetic_id",
        ty: "bool",
        nullable: false,
        format: "true when canonical_id is synthetic",
        example: "false",
    },
    FieldDoc {
        name: "isbn13",
        ty: "string",
        nullable: true,
        format: "13 digits",
        example: "9781491901427",
    },
    FieldDoc {
        name: "isbn10",
        ty: "string",
        nullable: true,
        format: "10 digits",
        example: "1491901423",
    },
    FieldDoc {
        name: "external_id",
        ty: "string",
        nullable: true,
        format: "catalog volume id",
        example: "7Mu-BwAAQBAJ",
    },
    FieldDoc {
        name: "title",
        ty: "string",
        nullable: true,
        format: "UTF-8 text",
        example: "Data Science from Scratch",
    },
    FieldDoc {
        name: "subtitle",
        ty: "string",
        nullable: true,
        format: "UTF-8 text",
        example: "First Principles with Python",
    },
    FieldDoc {
        name: "authors",
        ty: "string",
        nullable: true,
        format: "comma-separated names",
        example: "Joel Grus",
    },
    FieldDoc {
        name: "publisher",
        ty: "string",
        nullable: true,
        format: "free text",
        example: "O'Reilly",
    },
    FieldDoc {
        name: "pub_date",
        ty: "string",
        nullable: true,
        format: "ISO-8601 `YYYY`, `YYYY-MM` or `YYYY-MM-DD`",
        example: "2015-04-14",
    },
    FieldDoc {
        name: "language",
        ty: "string",
        nullable: true,
        format: "two-letter code",
        example: "en",
    },
    FieldDoc {
        name: "categories",
        ty: "string",
        nullable: true,
        format: "comma-separated list",
        example: "Computers",
    },
    FieldDoc {
        name: "price_amount",
        ty: "float",
        nullable: true,
        format: "non-negative decimal",
        example: "34.5",
    },
    FieldDoc {
        name: "price_currency",
        ty: "string",
        nullable: true,
        format: "ISO-4217",
        example: "USD",
    },
    FieldDoc {
        name: "rating",
        ty: "float",
        nullable: true,
        format: "0..5",
        example: "4.1",
    },
    FieldDoc {
        name: "rating_count",
        ty: "int",
        nullable: true,
        format: "non-negative integer",
        example: "1520",
    },
    FieldDoc {
        name: "provenance_title",
        ty: "string",
        nullable: true,
        format: "`primary` or `secondary`",
        example: "secondary",
    },
    FieldDoc {
        name: "provenance_authors",
        ty: "string",
        nullable: true,
        format: "`primary` or `secondary`",
        example: "secondary",
    },
    FieldDoc {
        name: "provenance_isbn10",
        ty: "string",
        nullable: true,
        format: "`primary` or `secondary`",
        example: "primary",
    },
    FieldDoc {
        name: "provenance_price",
        ty: "string",
        nullable: true,
        format: "`secondary`",
        example: "secondary",
    },
    FieldDoc {
        name: "source_ids",
        ty: "list<string>",
        nullable: false,
        format: "sorted `<source>:<ordinal>`",
        example: "[\"primary:0\", \"secondary:3\"]",
    },
    FieldDoc {
        name: "ingest_ts",
        ty: "timestamp",
        nullable: false,
        format: "RFC 3339, UTC",
        example: "2025-01-01T00:00:00Z",
    },
];

fn rule_for(field: &str) -> &'static str {
    if let Some((_, rule)) = CANONICAL_FIELD_RULES.iter().find(|(name, _)| *name == field) {
        return rule.describe();
    }
    match field {
        "canonical_id" => "ISBN-13 of the group, else synthetic key of its lowest-ordinal member",
        "synthetic_id" => "derived from canonical_id",
        "source_ids" => "every record in the group",
        "ingest_ts" => "run timestamp",
        name if name.starts_with("provenance_") => "source of the surviving value",
        _ => "",
    }
}

/// Renders field definitions, source priorities, dedup and survivorship rules.
pub fn render_schema_markdown(min_title_coverage: f64) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "# Schema: dim_book\n");
    let _ = writeln!(out, "## 1. Fields\n");
    let _ = writeln!(out, "| Field | Type | Nullable | Format | Example | Rule |");
    let _ = writeln!(out, "|-------|------|----------|--------|---------|------|");
    for field in FIELDS {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            field.name,
            field.ty,
            field.nullable,
            field.format,
            field.example,
            rule_for(field.name)
        );
    }

    let _ = writeln!(out, "\n## 2. Sources and priorities\n");
    let _ = writeln!(out, "| Field | Winner | Fallback |");
    let _ = writeln!(out, "|-------|--------|----------|");
    for (name, rule) in CANONICAL_FIELD_RULES {
        let (winner, fallback) = match rule {
            MergeRule::SourcePriority => ("secondary", "primary"),
            MergeRule::SecondaryOnly => ("secondary", "none"),
            MergeRule::FinestDate => ("secondary", "none"),
            MergeRule::Maximum if name.starts_with("rating") => ("primary", "none"),
            MergeRule::Maximum => ("secondary", "none"),
            MergeRule::Identity => ("secondary when linked", "primary"),
        };
        let _ = writeln!(out, "| {name} | {winner} | {fallback} |");
    }

    let _ = writeln!(out, "\n## 3. Deduplication\n");
    let _ = writeln!(
        out,
        "- Primary records link to catalog records by exact ISBN-13, then exact ISBN-10, \
         then title containment with a shared author token. The first match wins."
    );
    let _ = writeln!(
        out,
        "- Records sharing an ISBN-13, a synthetic key or a linked catalog record form one group."
    );
    let _ = writeln!(
        out,
        "- Without an ISBN-13 the key is `synth:` + the first 16 hex chars of \
         SHA-256(lowercase(title + \"|\" + author))."
    );
    let _ = writeln!(
        out,
        "- Catalog records no listing linked to join the group with their identity or form their own."
    );

    let _ = writeln!(out, "\n## 4. Survivorship\n");
    let _ = writeln!(out, "- Per row, a present catalog value beats the listing value.");
    let _ = writeln!(
        out,
        "- Per group, the longest text wins; equal lengths fall to the greater value, \
         identical values keep catalog provenance."
    );
    let _ = writeln!(out, "- Dates keep the finest granularity, then the most recent.");
    let _ = writeln!(out, "- Ratings, rating counts and prices keep the maximum.");

    let _ = writeln!(out, "\n## 5. Quality gate\n");
    let _ = writeln!(
        out,
        "- At least {:.0}% of detail rows carry a listing title.",
        min_title_coverage * 100.0
    );
    let _ = writeln!(out, "- No two detail rows share an ISBN-13.");
    let _ = writeln!(out, "- No price is negative.");

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_ruled_field_is_documented() {
        for (name, _) in CANONICAL_FIELD_RULES {
            assert!(FIELDS.iter().any(|f| f.name == *name), "{name} undocumented");
        }
    }

    #[test]
    fn test_markdown_lists_fields_and_threshold() {
        let md = render_schema_markdown(0.9);
        assert!(md.starts_with("# Schema: dim_book"));
        assert!(md.contains("| title | string | true |"));
        assert!(md.contains("| publisher | secondary | none |"));
        assert!(md.contains("At least 90% of detail rows"));
    }
}
