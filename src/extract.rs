//! Finds the quoted identifiers in a query that name files.
//!
//! This is not a SQL parser. The query is lexed with the engine's own
//! tokenizer and a small scanner tracks just enough context to know when
//! the next token sits in table position: after `FROM`, after any `JOIN`,
//! between commas of a `FROM` list, or after a leading `DESCRIBE`.
//! Parentheses open a new scope; a scope only counts as a query when it
//! starts with `SELECT`, `WITH` or `VALUES`, or when it directly follows a
//! table position (parenthesized joins). That keeps `EXTRACT(YEAR FROM x)`
//! and friends out.

use std::collections::HashSet;

use datafusion::sql::sqlparser::dialect::GenericDialect;
use datafusion::sql::sqlparser::keywords::Keyword;
use datafusion::sql::sqlparser::tokenizer::{Token, Tokenizer, Word};

/// Keywords that end a comma-separated `FROM` list.
const FROM_LIST_END: &[Keyword] = &[
    Keyword::WHERE,
    Keyword::GROUP,
    Keyword::HAVING,
    Keyword::ORDER,
    Keyword::LIMIT,
    Keyword::OFFSET,
    Keyword::FETCH,
    Keyword::UNION,
    Keyword::EXCEPT,
    Keyword::INTERSECT,
    Keyword::WINDOW,
    Keyword::QUALIFY,
    Keyword::SELECT,
    Keyword::VALUES,
    Keyword::SET,
    Keyword::RETURNING,
];

#[derive(Debug, Clone, Copy)]
struct Scope {
    query: bool,
    from_list: bool,
    fresh: bool,
}

impl Scope {
    fn root() -> Self {
        Self {
            query: true,
            from_list: false,
            fresh: false,
        }
    }
}

/// Return the file references of `sql`, deduplicated, in order of first
/// appearance.
///
/// Every delimited identifier (`"..."` or `` `...` ``) in table position is
/// a reference unless it is qualified (`"a"."b"`), called as a table
/// function, or bound as a common table expression name. Never fails: text
/// the tokenizer rejects has no references.
pub fn extract_references(sql: &str) -> Vec<String> {
    let Some(tokens) = significant_tokens(sql) else {
        return Vec::new();
    };

    let bindings = cte_bindings(&tokens);
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    let mut scopes = vec![Scope::root()];
    let mut expect_table = false;

    for (i, token) in tokens.iter().enumerate() {
        let prev = i.checked_sub(1).map(|j| &tokens[j]);

        if let Some(scope) = scopes.last_mut() {
            if scope.fresh {
                scope.fresh = false;
                if matches!(
                    keyword(token),
                    Some(Keyword::SELECT | Keyword::WITH | Keyword::VALUES)
                ) {
                    scope.query = true;
                }
            }
        }

        if expect_table {
            if matches!(keyword(token), Some(Keyword::LATERAL | Keyword::ONLY)) {
                continue;
            }
            if let Some(name) = delimited(token) {
                expect_table = false;
                let qualified_or_call = matches!(tokens.get(i + 1), Some(Token::Period | Token::LParen));
                if !qualified_or_call && !bindings.contains(name) && seen.insert(name) {
                    references.push(name.to_string());
                }
                continue;
            }
            if !matches!(token, Token::LParen) {
                expect_table = false;
            }
        }

        match token {
            Token::LParen => {
                scopes.push(Scope {
                    query: expect_table,
                    from_list: expect_table,
                    fresh: true,
                });
            }
            Token::RParen => {
                if scopes.len() > 1 {
                    scopes.pop();
                }
            }
            Token::SemiColon => {
                scopes.truncate(1);
                scopes[0].from_list = false;
                expect_table = false;
            }
            Token::Comma => {
                if scopes.last().is_some_and(|s| s.query && s.from_list) {
                    expect_table = true;
                }
            }
            Token::Word(w) if w.quote_style.is_none() => {
                let Some(scope) = scopes.last_mut() else {
                    continue;
                };
                match w.keyword {
                    Keyword::FROM if scope.query && !is_distinct_from(&tokens, i) => {
                        scope.from_list = true;
                        expect_table = true;
                    }
                    Keyword::JOIN | Keyword::APPLY if scope.query => {
                        scope.from_list = true;
                        expect_table = true;
                    }
                    Keyword::DESCRIBE if matches!(prev, None | Some(Token::SemiColon)) => {
                        expect_table = true;
                    }
                    k if FROM_LIST_END.contains(&k) => scope.from_list = false,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    references
}

/// Whether `sql` holds at least one statement and ends with `;`.
///
/// Unterminated quotes or comments count as incomplete.
pub fn is_complete_statement(sql: &str) -> bool {
    significant_tokens(sql).is_some_and(|tokens| matches!(tokens.last(), Some(Token::SemiColon)))
}

fn significant_tokens(sql: &str) -> Option<Vec<Token>> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, sql).tokenize().ok()?;
    Some(
        tokens
            .into_iter()
            .filter(|t| !matches!(t, Token::Whitespace(_) | Token::EOF))
            .collect(),
    )
}

fn keyword(token: &Token) -> Option<Keyword> {
    match token {
        Token::Word(w) if w.quote_style.is_none() => Some(w.keyword),
        _ => None,
    }
}

fn delimited(token: &Token) -> Option<&str> {
    match token {
        Token::Word(Word {
            value,
            quote_style: Some('"' | '`'),
            ..
        }) => Some(value.as_str()),
        _ => None,
    }
}

/// `IS [NOT] DISTINCT FROM` is a comparison, not a table position.
fn is_distinct_from(tokens: &[Token], from: usize) -> bool {
    let before = |n: usize| from.checked_sub(n).and_then(|j| keyword(&tokens[j]));
    before(1) == Some(Keyword::DISTINCT) && matches!(before(2), Some(Keyword::IS | Keyword::NOT))
}

/// Names bound by `WITH name [(columns)] AS [[NOT] MATERIALIZED] (...)`.
fn cte_bindings(tokens: &[Token]) -> HashSet<&str> {
    let mut bindings = HashSet::new();

    for (i, token) in tokens.iter().enumerate() {
        if keyword(token) != Some(Keyword::AS) {
            continue;
        }
        let body = tokens[i + 1..]
            .iter()
            .find(|t| !matches!(keyword(t), Some(Keyword::NOT | Keyword::MATERIALIZED)));
        if !matches!(body, Some(Token::LParen)) || i == 0 {
            continue;
        }

        let mut name_at = i - 1;
        if matches!(tokens[name_at], Token::RParen) {
            match matching_lparen(tokens, name_at) {
                Some(open) if open > 0 => name_at = open - 1,
                _ => continue,
            }
        }

        let introduced = name_at
            .checked_sub(1)
            .map(|j| &tokens[j])
            .is_some_and(|t| {
                matches!(t, Token::Comma)
                    || matches!(keyword(t), Some(Keyword::WITH | Keyword::RECURSIVE))
            });
        if let (true, Token::Word(w)) = (introduced, &tokens[name_at]) {
            bindings.insert(w.value.as_str());
        }
    }

    bindings
}

fn matching_lparen(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for j in (0..=close).rev() {
        match tokens[j] {
            Token::RParen => depth += 1,
            Token::LParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        assert_eq!(extract_references(r#"SELECT * FROM "./data.csv" AS d"#), ["./data.csv"]);
        assert_eq!(extract_references(r#"SELECT * FROM "./data.csv""#), ["./data.csv"]);
        assert_eq!(extract_references("SELECT * FROM `data.json`"), ["data.json"]);
    }

    #[test]
    fn test_no_references_is_empty() {
        assert!(extract_references("SELECT 1").is_empty());
        assert!(extract_references("SELECT * FROM people WHERE name = 'x.csv'").is_empty());
        assert!(extract_references("").is_empty());
    }

    #[test]
    fn test_join_select() {
        let sql = r#"
            SELECT a.id, b.name
            FROM "./users.csv" AS a
            JOIN "./names.json" AS b ON a.id = b.user_id
            LEFT OUTER JOIN "./extra.tsv" c USING (id)
            CROSS JOIN "./more.csv"
        "#;
        assert_eq!(
            extract_references(sql),
            ["./users.csv", "./names.json", "./extra.tsv", "./more.csv"]
        );
    }

    #[test]
    fn test_subquery_select() {
        let sql = r#"
            SELECT *
            FROM (
                SELECT id FROM "./inner.csv" AS x WHERE x.enabled = 1
            ) AS sub
            JOIN "./outer.json" AS y ON sub.id = y.id
            WHERE y.id IN (SELECT id FROM "./filter.csv")
        "#;
        assert_eq!(
            extract_references(sql),
            ["./inner.csv", "./outer.json", "./filter.csv"]
        );
    }

    #[test]
    fn test_cte_select() {
        let sql = r#"
            WITH temp AS (
                SELECT * FROM "./base.csv" AS base
            ), "quoted" (a, b) AS MATERIALIZED (SELECT 1, 2)
            SELECT * FROM temp JOIN "./other.json" AS o ON temp.id = o.id
            JOIN "quoted" q ON q.a = o.id JOIN "temp" t ON t.id = o.id
        "#;
        assert_eq!(extract_references(sql), ["./base.csv", "./other.json"]);
    }

    #[test]
    fn test_dedup_keeps_first_appearance() {
        let sql = r#"
            SELECT * FROM "b.csv" JOIN "a.csv" USING (id)
            UNION ALL SELECT * FROM "a.csv" JOIN "b.csv" USING (id)
        "#;
        assert_eq!(extract_references(sql), ["b.csv", "a.csv"]);
    }

    #[test]
    fn test_dedup_is_by_literal_spelling() {
        let sql = r#"SELECT * FROM "data.csv" JOIN "./data.csv" USING (id)"#;
        assert_eq!(extract_references(sql), ["data.csv", "./data.csv"]);
    }

    #[test]
    fn test_comma_separated_from_list() {
        let sql = r#"SELECT * FROM "a.csv" a, "b.csv" AS b, (SELECT 1) c, "c.json" WHERE a.x = b.x"#;
        assert_eq!(extract_references(sql), ["a.csv", "b.csv", "c.json"]);
    }

    #[test]
    fn test_comma_after_join_condition() {
        let sql = r#"SELECT * FROM "a.csv" a JOIN "b.csv" b ON a.id = b.id, "c.csv" c"#;
        assert_eq!(extract_references(sql), ["a.csv", "b.csv", "c.csv"]);

        let sql = r#"SELECT * FROM "a.csv" JOIN "b.csv" USING (id, k), "c.csv" WHERE x IN (1, 2)"#;
        assert_eq!(extract_references(sql), ["a.csv", "b.csv", "c.csv"]);
    }

    #[test]
    fn test_commas_inside_join_condition_calls() {
        let sql = r#"SELECT * FROM "a.csv" a JOIN "b.csv" b ON coalesce(a.id, "x") = b.id WHERE "y" IN ("z", 1)"#;
        assert_eq!(extract_references(sql), ["a.csv", "b.csv"]);
    }

    #[test]
    fn test_select_list_commas_are_not_tables() {
        let sql = r#"SELECT "x", "y" FROM "t.csv" WHERE "x" = 'a', "z""#;
        assert_eq!(extract_references(sql), ["t.csv"]);
    }

    #[test]
    fn test_literals_outside_table_position() {
        let sql = r#"SELECT * FROM "people.csv" WHERE "name" = 'Bob' AND note = "other.csv""#;
        assert_eq!(extract_references(sql), ["people.csv"]);
    }

    #[test]
    fn test_from_inside_function_calls() {
        let sql = r#"
            SELECT EXTRACT(YEAR FROM "ts"), SUBSTRING("name" FROM 2), TRIM(BOTH 'x' FROM "pad")
            FROM "events.csv"
            WHERE "a" IS DISTINCT FROM "b" AND "c" IS NOT DISTINCT FROM "d"
        "#;
        assert_eq!(extract_references(sql), ["events.csv"]);
    }

    #[test]
    fn test_scalar_subquery_inside_call() {
        let sql = r#"SELECT COALESCE((SELECT max(v) FROM "vals.json"), 0) FROM "t.csv""#;
        assert_eq!(extract_references(sql), ["vals.json", "t.csv"]);
    }

    #[test]
    fn test_parenthesized_join() {
        let sql = r#"SELECT * FROM ("a.csv" JOIN "b.csv" USING (id))"#;
        assert_eq!(extract_references(sql), ["a.csv", "b.csv"]);
    }

    #[test]
    fn test_qualified_names_and_table_functions() {
        let sql = r#"SELECT * FROM "schema"."table" JOIN "fn"('x') ON true JOIN s."t.csv" ON true"#;
        assert!(extract_references(sql).is_empty());
    }

    #[test]
    fn test_lateral() {
        let sql = r#"SELECT * FROM "a.csv" a CROSS JOIN LATERAL (SELECT * FROM "b.csv" WHERE b.id = a.id)"#;
        assert_eq!(extract_references(sql), ["a.csv", "b.csv"]);
    }

    #[test]
    fn test_quoting_rules() {
        let sql = r#"SELECT * FROM "my ""quoted"" file.csv" JOIN "select from.csv" USING (id)"#;
        assert_eq!(
            extract_references(sql),
            [r#"my "quoted" file.csv"#, "select from.csv"]
        );
    }

    #[test]
    fn test_comments_are_ignored() {
        let sql = "SELECT * -- FROM \"no.csv\"\nFROM /* \"nope.csv\" */ \"yes.csv\"";
        assert_eq!(extract_references(sql), ["yes.csv"]);
    }

    #[test]
    fn test_multiple_statements_and_describe() {
        let sql = r#"DESCRIBE "d.csv"; CREATE VIEW v AS SELECT * FROM "v.json"; SELECT * FROM v"#;
        assert_eq!(extract_references(sql), ["d.csv", "v.json"]);
    }

    #[test]
    fn test_unterminated_quote_is_total() {
        assert!(extract_references(r#"SELECT * FROM "broken.csv"#).is_empty());
    }

    #[test]
    fn test_statement_completeness() {
        assert!(is_complete_statement("SELECT 1;"));
        assert!(is_complete_statement("SELECT *\nFROM \"a.csv\";  -- done"));
        assert!(is_complete_statement("-- comment\n;"));
        assert!(!is_complete_statement("SELECT 1"));
        assert!(!is_complete_statement("SELECT ';"));
        assert!(!is_complete_statement("SELECT 1; SELECT 2"));
        assert!(!is_complete_statement(""));
    }
}
