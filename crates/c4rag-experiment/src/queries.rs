//! Evaluation query sets.
//!
//! JSON Lines, one query per line:
//! `{"id"?, "query", "relevant_passage_ids"?, "answers"?, "irrelevant_document"?}`.
//! `question` is accepted for `query`. Every query needs at least one
//! relevant passage id or answer string.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use c4rag_core::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalQuery {
    pub id: String,
    pub query: String,
    pub relevant_passage_ids: Vec<String>,
    pub answers: Vec<String>,
    /// A document known not to answer the query; tri retrieval uses it.
    pub irrelevant_document: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
struct RawQuery {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(alias = "question")]
    query: String,
    #[serde(default)]
    relevant_passage_ids: Vec<String>,
    #[serde(default)]
    answers: Vec<String>,
    #[serde(default)]
    irrelevant_document: Option<String>,
}

pub fn load_queries(path: &Path) -> Result<Vec<EvalQuery>> {
    let reader = BufReader::new(File::open(path)?);
    parse_queries(reader)
}

pub fn parse_queries<R: BufRead>(reader: R) -> Result<Vec<EvalQuery>> {
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|e| Error::QuerySet { line: line_no, message: e.to_string() })?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(parse_line(&line, line_no)?);
    }
    Ok(out)
}

fn parse_line(line: &str, line_no: usize) -> Result<EvalQuery> {
    let raw: RawQuery =
        serde_json::from_str(line).map_err(|e| Error::QuerySet { line: line_no, message: e.to_string() })?;
    if raw.query.trim().is_empty() {
        return Err(Error::QuerySet { line: line_no, message: "query text is empty".into() });
    }
    let answers: Vec<String> = raw.answers.into_iter().filter(|a| !a.trim().is_empty()).collect();
    if raw.relevant_passage_ids.is_empty() && answers.is_empty() {
        return Err(Error::QuerySet {
            line: line_no,
            message: "query has neither relevant_passage_ids nor answers".into(),
        });
    }
    let id = match raw.id {
        Some(RawId::Text(s)) if !s.trim().is_empty() => s,
        Some(RawId::Number(n)) => n.to_string(),
        _ => format!("q{}", line_no),
    };
    Ok(EvalQuery {
        id,
        query: raw.query,
        relevant_passage_ids: raw.relevant_passage_ids,
        answers,
        irrelevant_document: raw.irrelevant_document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_aliases() {
        let input = "{\"question\": \"Who?\", \"answers\": [\"Ada\"]}\n\n{\"id\": 7, \"query\": \"Where?\", \"relevant_passage_ids\": [\"d:0\"]}\n";
        let queries = parse_queries(input.as_bytes()).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].id, "q1");
        assert_eq!(queries[0].query, "Who?");
        assert_eq!(queries[1].id, "7");
        assert_eq!(queries[1].irrelevant_document, None);
    }

    #[test]
    fn unlabelled_query_is_rejected_with_line() {
        let input = "{\"query\": \"a\", \"answers\": [\"x\"]}\n{\"query\": \"b\", \"answers\": [\" \"]}\n";
        match parse_queries(input.as_bytes()) {
            Err(Error::QuerySet { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_json_reports_line() {
        let input = "{\"query\": \"a\", \"answers\": [\"x\"]}\n{not json\n";
        assert!(matches!(parse_queries(input.as_bytes()), Err(Error::QuerySet { line: 2, .. })));
    }
}
