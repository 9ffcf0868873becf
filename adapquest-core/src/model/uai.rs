//! Reader for Bayesian networks in the UAI text format.
//!
//! ```text
//! BAYES
//! 2            number of variables
//! 2 2          cardinalities
//! 2            number of factors
//! 1 0          scope of factor 0: the variable itself
//! 2 0 1        scope of factor 1: parents first, child last
//! 2  0.5 0.5
//! 4  0.9 0.1 0.2 0.8
//! ```
//!
//! Tables list the child state fastest, which is the layout [`Node`] uses.

use std::collections::BTreeMap;

use super::{BayesianNetwork, Node, VarId};
use crate::error::ModelError;

struct Tokens<'a> {
    inner: std::iter::Enumerate<std::str::SplitWhitespace<'a>>,
    position: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace().enumerate(),
            position: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> ModelError {
        ModelError::Parse {
            position: self.position,
            message: message.into(),
        }
    }

    fn next_token(&mut self, what: &str) -> Result<&'a str, ModelError> {
        match self.inner.next() {
            Some((position, token)) => {
                self.position = position;
                Ok(token)
            }
            None => Err(self.error(format!("unexpected end of input, expected {what}"))),
        }
    }

    fn usize(&mut self, what: &str) -> Result<usize, ModelError> {
        let token = self.next_token(what)?;
        token
            .parse()
            .map_err(|_| self.error(format!("expected {what}, found '{token}'")))
    }

    fn f64(&mut self, what: &str) -> Result<f64, ModelError> {
        let token = self.next_token(what)?;
        token
            .parse()
            .map_err(|_| self.error(format!("expected {what}, found '{token}'")))
    }
}

/// Parse a `BAYES` network and validate its structure.
pub fn parse(text: &str) -> Result<BayesianNetwork, ModelError> {
    let mut tokens = Tokens::new(text);

    let preamble = tokens.next_token("network type")?;
    if !preamble.eq_ignore_ascii_case("BAYES") {
        return Err(tokens.error(format!("unsupported network type '{preamble}'")));
    }

    let count = tokens.usize("variable count")?;
    let sizes = (0..count)
        .map(|_| tokens.usize("cardinality"))
        .collect::<Result<Vec<_>, _>>()?;

    let factors = tokens.usize("factor count")?;
    let mut scopes = Vec::with_capacity(factors);
    for _ in 0..factors {
        let arity = tokens.usize("scope size")?;
        if arity == 0 {
            return Err(tokens.error("empty factor scope"));
        }
        let scope = (0..arity)
            .map(|_| {
                let variable = tokens.usize("variable index")?;
                if variable >= count {
                    return Err(tokens.error(format!("variable {variable} out of range")));
                }
                Ok(variable)
            })
            .collect::<Result<Vec<VarId>, _>>()?;
        scopes.push(scope);
    }

    let mut nodes = BTreeMap::new();
    for scope in scopes {
        let entries = tokens.usize("table size")?;
        let table = (0..entries)
            .map(|_| tokens.f64("probability"))
            .collect::<Result<Vec<_>, _>>()?;

        let Some((&child, parents)) = scope.split_last() else {
            continue;
        };
        let parents = parents.iter().map(|&p| (p, sizes[p])).collect();
        let node = Node::new(child, sizes[child], parents, table)?;
        if nodes.insert(child, node).is_some() {
            return Err(tokens.error(format!("variable {child} has more than one factor")));
        }
    }

    if tokens.inner.next().is_some() {
        return Err(tokens.error("trailing data after last table"));
    }
    if let Some(missing) = (0..count).find(|v| !nodes.contains_key(v)) {
        return Err(tokens.error(format!("variable {missing} has no factor")));
    }

    let mut network = BayesianNetwork::new();
    for (variable, node) in nodes {
        network.insert(variable, node);
    }
    network.validate()?;
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    const SMALL: &str = "BAYES
2
2 2
2
1 0
2 0 1
2 0.5 0.5
4 0.9 0.1 0.2 0.8
";

    #[test]
    fn parses_skill_with_question() {
        let network = parse(SMALL).unwrap();
        assert_eq!(network.len(), 2);
        assert_eq!(network.parents(1), &[0]);
        assert_eq!(network.node(1).unwrap().table(), &[0.9, 0.1, 0.2, 0.8]);
    }

    #[test]
    fn preamble_is_case_insensitive() {
        assert!(parse(&SMALL.replace("BAYES", "bayes")).is_ok());
    }

    #[test]
    fn rejects_markov_networks() {
        let error = parse(&SMALL.replace("BAYES", "MARKOV")).unwrap_err();
        assert!(error.to_string().contains("unsupported network type"));
    }

    #[test]
    fn rejects_truncated_tables() {
        let truncated = SMALL.trim_end().trim_end_matches("0.8");
        let error = parse(truncated).unwrap_err();
        assert!(error.to_string().contains("unexpected end of input"));
    }

    #[test]
    fn rejects_wrong_table_size() {
        let text = SMALL.replace("4 0.9 0.1 0.2 0.8", "3 0.9 0.1 0.2");
        assert!(matches!(
            parse(&text),
            Err(ModelError::InvalidTable { variable: 1, .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_variable() {
        let text = SMALL.replace("2 0 1", "2 0 5");
        let error = parse(&text).unwrap_err();
        assert!(error.to_string().contains("variable 5 out of range"));
    }

    #[test]
    fn rejects_variables_without_factor() {
        let text = "BAYES 2 2 2 1 1 1 2 0.5 0.5";
        let error = parse(text).unwrap_err();
        assert!(error.to_string().contains("variable 0 has no factor"));
    }

    #[test]
    fn reports_token_position_of_bad_number() {
        let text = SMALL.replace("0.9", "x");
        match parse(&text) {
            Err(ModelError::Parse { position, message }) => {
                assert!(message.contains("'x'"));
                assert!(position > 10);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
