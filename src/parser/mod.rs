//! # Rule Parser
//!
//! Parses GP 2 rule declarations into AST. Handles variable declaration
//! lists, left/right graphs with root and bidirectional markers, labels
//! with list atoms and marks, interface lists, `where` conditions, and
//! `//` comments.
//!
//! ```text
//! delete_loop (n : int)
//! [ (n1, n) | (e1, n1, n1, 1) ]
//! =>
//! [ (n1, n) | ]
//! interface = {n1}
//! ```
//!
//! Program-level constructs (Main, if/try/alap, procedure definitions)
//! are the program compiler's concern and are not accepted here; a
//! program is a sequence of rule declarations.

use crate::ast::{
    AstAtom, AstCondition, AstEdge, AstGraph, AstLabel, AstNode, Declaration, RuleDecl,
    VarDeclGroup,
};
use crate::label::{Mark, VarType};

/// Parse a sequence of rule declarations.
pub fn parse_program(source: &str) -> Result<Vec<Declaration>, String> {
    let mut parser = Parser::new(source);
    let mut decls = Vec::new();
    parser.skip_trivia();
    while !parser.at_end() {
        let rule = parser.parse_rule()?;
        decls.push(Declaration::Rule(rule));
        parser.skip_trivia();
    }
    Ok(decls)
}

/// Parse a single rule declaration.
pub fn parse_rule(source: &str) -> Result<RuleDecl, String> {
    let mut parser = Parser::new(source);
    parser.skip_trivia();
    let rule = parser.parse_rule()?;
    parser.skip_trivia();
    if !parser.at_end() {
        return Err(parser.error("trailing input after rule declaration"));
    }
    Ok(rule)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Parser {
        Parser {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    // ------------------------------------------------------------------
    // Low-level scanning
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Skip whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.pos += 1;
            }
            if self.peek() == Some('/') && self.chars.get(self.pos + 1) == Some(&'/') {
                while !matches!(self.peek(), None | Some('\n')) {
                    self.pos += 1;
                }
            } else {
                return;
            }
        }
    }

    fn error(&self, message: &str) -> String {
        let mut line = 1;
        let mut column = 1;
        for &c in self.chars.iter().take(self.pos) {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        format!("line {line}, column {column}: {message}")
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        self.skip_trivia();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(&format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(&format!("expected '{expected}', found end of input"))),
        }
    }

    /// Consume the given punctuation if it is next.
    fn eat(&mut self, expected: char) -> bool {
        self.skip_trivia();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the given keyword if it is next (whole word).
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_trivia();
        let end = self.pos + keyword.len();
        if end > self.chars.len() {
            return false;
        }
        let slice: String = self.chars[self.pos..end].iter().collect();
        if slice != keyword {
            return false;
        }
        if let Some(&next) = self.chars.get(end) {
            if next.is_alphanumeric() || next == '_' {
                return false;
            }
        }
        self.pos = end;
        true
    }

    fn identifier(&mut self) -> Result<String, String> {
        self.skip_trivia();
        let mut name = String::new();
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {
                name.push(c);
                self.pos += 1;
            }
            _ => return Err(self.error("expected an identifier")),
        }
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn integer(&mut self) -> Result<i32, String> {
        self.skip_trivia();
        let mut digits = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            digits.push(self.bump().unwrap());
        }
        if digits.is_empty() {
            return Err(self.error("expected an integer"));
        }
        digits
            .parse::<i32>()
            .map_err(|_| self.error("integer literal out of range"))
    }

    fn string_literal(&mut self) -> Result<String, String> {
        self.expect('"')?;
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string literal")),
            }
        }
    }

    // ------------------------------------------------------------------
    // Rule declarations
    // ------------------------------------------------------------------

    fn parse_rule(&mut self) -> Result<RuleDecl, String> {
        let name = self.identifier()?;
        let variables = if self.eat('(') {
            self.parse_variable_decls()?
        } else {
            Vec::new()
        };
        let lhs = self.parse_graph()?;
        self.skip_trivia();
        if !(self.eat('=') && self.eat('>')) {
            return Err(self.error("expected '=>' between left and right graphs"));
        }
        let rhs = self.parse_graph()?;

        let interface = if self.eat_keyword("interface") {
            self.expect('=')?;
            self.parse_interface()?
        } else {
            Vec::new()
        };

        let condition = if self.eat_keyword("where") {
            Some(self.parse_condition()?)
        } else {
            None
        };

        Ok(RuleDecl {
            name,
            variables,
            lhs,
            rhs,
            interface,
            condition,
        })
    }

    /// `a, b : int; s : string` up to the closing parenthesis.
    fn parse_variable_decls(&mut self) -> Result<Vec<VarDeclGroup>, String> {
        let mut groups = Vec::new();
        if self.eat(')') {
            return Ok(groups);
        }
        loop {
            let mut names = vec![self.identifier()?];
            while self.eat(',') {
                names.push(self.identifier()?);
            }
            self.expect(':')?;
            let keyword = self.identifier()?;
            let var_type = VarType::from_keyword(&keyword)
                .ok_or_else(|| self.error(&format!("unknown variable type '{keyword}'")))?;
            groups.push(VarDeclGroup { names, var_type });
            if self.eat(';') {
                continue;
            }
            self.expect(')')?;
            return Ok(groups);
        }
    }

    /// `[ nodes | edges ]`. Both sections may be empty.
    fn parse_graph(&mut self) -> Result<AstGraph, String> {
        self.expect('[')?;
        let mut graph = AstGraph::default();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some('(') => graph.nodes.push(self.parse_node()?),
                Some('|') => {
                    self.pos += 1;
                    break;
                }
                Some(']') => {
                    self.pos += 1;
                    return Ok(graph);
                }
                _ => return Err(self.error("expected a node, '|' or ']'")),
            }
        }
        loop {
            self.skip_trivia();
            match self.peek() {
                Some('(') => graph.edges.push(self.parse_edge()?),
                Some(']') => {
                    self.pos += 1;
                    return Ok(graph);
                }
                _ => return Err(self.error("expected an edge or ']'")),
            }
        }
    }

    /// `(name, label)` with an optional `(R)` root marker after the name.
    fn parse_node(&mut self) -> Result<AstNode, String> {
        self.expect('(')?;
        let name = self.identifier()?;
        let root = self.parse_item_marker('R')?;
        let label = if self.eat(',') {
            self.parse_label()?
        } else {
            AstLabel::empty()
        };
        self.expect(')')?;
        Ok(AstNode { name, root, label })
    }

    /// `(name, source, target, label)` with an optional `(B)` marker.
    fn parse_edge(&mut self) -> Result<AstEdge, String> {
        self.expect('(')?;
        let name = self.identifier()?;
        let bidirectional = self.parse_item_marker('B')?;
        self.expect(',')?;
        let source = self.identifier()?;
        self.expect(',')?;
        let target = self.identifier()?;
        let label = if self.eat(',') {
            self.parse_label()?
        } else {
            AstLabel::empty()
        };
        self.expect(')')?;
        Ok(AstEdge {
            name,
            bidirectional,
            source,
            target,
            label,
        })
    }

    /// An optional `(R)` or `(B)` marker directly after an item name.
    fn parse_item_marker(&mut self, marker: char) -> Result<bool, String> {
        self.skip_trivia();
        if self.peek() != Some('(') {
            return Ok(false);
        }
        // Only a lone marker letter counts; anything else is left alone.
        let saved = self.pos;
        self.pos += 1;
        self.skip_trivia();
        if self.peek() == Some(marker) {
            self.pos += 1;
            if self.eat(')') {
                return Ok(true);
            }
        }
        self.pos = saved;
        Ok(false)
    }

    /// `{ a, b, c }`, possibly empty.
    fn parse_interface(&mut self) -> Result<Vec<String>, String> {
        self.expect('{')?;
        let mut names = Vec::new();
        if self.eat('}') {
            return Ok(names);
        }
        loop {
            names.push(self.identifier()?);
            if self.eat(',') {
                continue;
            }
            self.expect('}')?;
            return Ok(names);
        }
    }

    // ------------------------------------------------------------------
    // Labels and atoms
    // ------------------------------------------------------------------

    /// `empty`, or a `:`-separated atom list, optionally `# mark`.
    fn parse_label(&mut self) -> Result<AstLabel, String> {
        let atoms = if self.eat_keyword("empty") {
            Vec::new()
        } else {
            let mut atoms = vec![self.parse_atom()?];
            while self.eat(':') {
                atoms.push(self.parse_atom()?);
            }
            atoms
        };
        let mark = if self.eat('#') {
            let keyword = self.identifier()?;
            Mark::from_keyword(&keyword)
                .ok_or_else(|| self.error(&format!("unknown mark '{keyword}'")))?
        } else {
            Mark::None
        };
        Ok(AstLabel { mark, atoms })
    }

    /// Additive level: `+`, `-` and string concatenation `.`.
    fn parse_atom(&mut self) -> Result<AstAtom, String> {
        let mut left = self.parse_term()?;
        loop {
            self.skip_trivia();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    let right = self.parse_term()?;
                    left = AstAtom::Add(Box::new(left), Box::new(right));
                }
                Some('-') => {
                    self.pos += 1;
                    let right = self.parse_term()?;
                    left = AstAtom::Subtract(Box::new(left), Box::new(right));
                }
                Some('.') => {
                    self.pos += 1;
                    let right = self.parse_term()?;
                    left = AstAtom::Concat(Box::new(left), Box::new(right));
                }
                _ => return Ok(left),
            }
        }
    }

    /// Multiplicative level: `*` and `/`.
    fn parse_term(&mut self) -> Result<AstAtom, String> {
        let mut left = self.parse_factor()?;
        loop {
            self.skip_trivia();
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    let right = self.parse_factor()?;
                    left = AstAtom::Multiply(Box::new(left), Box::new(right));
                }
                Some('/') => {
                    self.pos += 1;
                    let right = self.parse_factor()?;
                    left = AstAtom::Divide(Box::new(left), Box::new(right));
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_factor(&mut self) -> Result<AstAtom, String> {
        self.skip_trivia();
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                let inner = self.parse_factor()?;
                Ok(AstAtom::Neg(Box::new(inner)))
            }
            Some('(') => {
                self.pos += 1;
                let atom = self.parse_atom()?;
                self.expect(')')?;
                Ok(atom)
            }
            Some('"') => Ok(AstAtom::String(self.string_literal()?)),
            Some(c) if c.is_ascii_digit() => Ok(AstAtom::Integer(self.integer()?)),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let name = self.identifier()?;
                match name.as_str() {
                    "indeg" | "outdeg" | "length" => {
                        self.expect('(')?;
                        let arg = self.identifier()?;
                        self.expect(')')?;
                        Ok(match name.as_str() {
                            "indeg" => AstAtom::Indegree(arg),
                            "outdeg" => AstAtom::Outdegree(arg),
                            _ => AstAtom::Length(arg),
                        })
                    }
                    _ => Ok(AstAtom::Variable(name)),
                }
            }
            _ => Err(self.error("expected an atom")),
        }
    }

    // ------------------------------------------------------------------
    // Conditions
    // ------------------------------------------------------------------

    fn parse_condition(&mut self) -> Result<AstCondition, String> {
        let mut left = self.parse_condition_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_condition_and()?;
            left = AstCondition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_condition_and(&mut self) -> Result<AstCondition, String> {
        let mut left = self.parse_condition_unary()?;
        while self.eat_keyword("and") {
            let right = self.parse_condition_unary()?;
            left = AstCondition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_condition_unary(&mut self) -> Result<AstCondition, String> {
        if self.eat_keyword("not") {
            let inner = self.parse_condition_unary()?;
            return Ok(AstCondition::Not(Box::new(inner)));
        }
        self.skip_trivia();
        // Parenthesised sub-conditions only; a parenthesised *atom* is
        // handled by the relational branch below.
        if self.peek() == Some('(') {
            let saved = self.pos;
            self.pos += 1;
            if let Ok(cond) = self.parse_condition() {
                if self.eat(')') {
                    return Ok(cond);
                }
            }
            self.pos = saved;
        }
        self.parse_condition_primary()
    }

    fn parse_condition_primary(&mut self) -> Result<AstCondition, String> {
        for (keyword, build) in [
            ("int", AstCondition::IntCheck as fn(String) -> AstCondition),
            ("char", AstCondition::CharCheck as fn(String) -> AstCondition),
            (
                "string",
                AstCondition::StringCheck as fn(String) -> AstCondition,
            ),
            ("atom", AstCondition::AtomCheck as fn(String) -> AstCondition),
        ] {
            let saved = self.pos;
            if self.eat_keyword(keyword) {
                if self.eat('(') {
                    let var = self.identifier()?;
                    self.expect(')')?;
                    return Ok(build(var));
                }
                self.pos = saved;
            }
        }

        let saved = self.pos;
        if self.eat_keyword("edge") {
            if self.eat('(') {
                let source = self.identifier()?;
                self.expect(',')?;
                let target = self.identifier()?;
                let label = if self.eat(',') {
                    Some(self.parse_label()?)
                } else {
                    None
                };
                self.expect(')')?;
                return Ok(AstCondition::EdgePred {
                    source,
                    target,
                    label,
                });
            }
            self.pos = saved;
        }

        self.parse_relational()
    }

    /// `list op list` where op is one of `=`, `!=`, `>`, `>=`, `<`, `<=`.
    fn parse_relational(&mut self) -> Result<AstCondition, String> {
        let left = self.parse_atom_list()?;
        self.skip_trivia();
        let op = match (self.peek(), self.chars.get(self.pos + 1).copied()) {
            (Some('!'), Some('=')) => {
                self.pos += 2;
                "!="
            }
            (Some('>'), Some('=')) => {
                self.pos += 2;
                ">="
            }
            (Some('<'), Some('=')) => {
                self.pos += 2;
                "<="
            }
            (Some('='), _) => {
                self.pos += 1;
                "="
            }
            (Some('>'), _) => {
                self.pos += 1;
                ">"
            }
            (Some('<'), _) => {
                self.pos += 1;
                "<"
            }
            _ => return Err(self.error("expected a relational operator")),
        };
        let right = self.parse_atom_list()?;
        let single = |mut list: Vec<AstAtom>, parser: &Parser| -> Result<AstAtom, String> {
            if list.len() == 1 {
                Ok(list.remove(0))
            } else {
                Err(parser.error("comparison operands must be single atoms"))
            }
        };
        Ok(match op {
            "=" => AstCondition::Equal(left, right),
            "!=" => AstCondition::NotEqual(left, right),
            ">" => AstCondition::Greater(single(left, self)?, single(right, self)?),
            ">=" => AstCondition::GreaterEqual(single(left, self)?, single(right, self)?),
            "<" => AstCondition::Less(single(left, self)?, single(right, self)?),
            _ => AstCondition::LessEqual(single(left, self)?, single(right, self)?),
        })
    }

    fn parse_atom_list(&mut self) -> Result<Vec<AstAtom>, String> {
        if self.eat_keyword("empty") {
            return Ok(Vec::new());
        }
        let mut atoms = vec![self.parse_atom()?];
        while self.eat(':') {
            atoms.push(self.parse_atom()?);
        }
        Ok(atoms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_rule() {
        let rule = parse_rule("r1 [ | ] => [ | ]").unwrap();
        assert_eq!(rule.name, "r1");
        assert!(rule.lhs.is_empty());
        assert!(rule.rhs.is_empty());
        assert!(rule.interface.is_empty());
        assert!(rule.condition.is_none());
    }

    #[test]
    fn test_parse_delete_loop() {
        let source = "delete_loop [ (n1, empty) | (e1, n1, n1, 1) ] => [ (n1, empty) | ] \
                      interface = {n1}";
        let rule = parse_rule(source).unwrap();
        assert_eq!(rule.lhs.nodes.len(), 1);
        assert_eq!(rule.lhs.edges.len(), 1);
        let edge = &rule.lhs.edges[0];
        assert_eq!(edge.source, "n1");
        assert_eq!(edge.target, "n1");
        assert_eq!(edge.label.atoms, vec![AstAtom::Integer(1)]);
        assert_eq!(rule.interface, vec!["n1".to_string()]);
    }

    #[test]
    fn test_parse_root_and_bidirectional_markers() {
        let source = "r [ (n1 (R), empty) (n2, empty) | (e1 (B), n1, n2, empty) ] => [ | ]";
        let rule = parse_rule(source).unwrap();
        assert!(rule.lhs.nodes[0].root);
        assert!(!rule.lhs.nodes[1].root);
        assert!(rule.lhs.edges[0].bidirectional);
    }

    #[test]
    fn test_parse_marks() {
        let source = "r [ (n1, 1 # red) (n2, \"a\" # any) | ] => [ | ]";
        let rule = parse_rule(source).unwrap();
        assert_eq!(rule.lhs.nodes[0].label.mark, Mark::Red);
        assert_eq!(rule.lhs.nodes[1].label.mark, Mark::Any);
    }

    #[test]
    fn test_parse_list_label() {
        let source = "r (x : list) [ (n1, 1 : x : \"end\") | ] => [ | ]";
        let rule = parse_rule(source).unwrap();
        let atoms = &rule.lhs.nodes[0].label.atoms;
        assert_eq!(atoms.len(), 3);
        assert_eq!(atoms[0], AstAtom::Integer(1));
        assert_eq!(atoms[1], AstAtom::Variable("x".into()));
        assert_eq!(atoms[2], AstAtom::String("end".into()));
    }

    #[test]
    fn test_parse_variable_decl_groups() {
        let source = "r (x, y : int; s : string; l : list) [ | ] => [ | ]";
        let rule = parse_rule(source).unwrap();
        assert_eq!(rule.variables.len(), 3);
        assert_eq!(rule.variables[0].names, vec!["x", "y"]);
        assert_eq!(rule.variables[0].var_type, VarType::Integer);
        assert_eq!(rule.variables[2].var_type, VarType::List);
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        let source = "r (x : int) [ | ] => [ (n1, x + 2 * 3) | ]";
        let rule = parse_rule(source).unwrap();
        let atom = &rule.rhs.nodes[0].label.atoms[0];
        match atom {
            AstAtom::Add(left, right) => {
                assert_eq!(**left, AstAtom::Variable("x".into()));
                assert!(matches!(**right, AstAtom::Multiply(..)));
            }
            other => panic!("expected addition at the top, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_degree_operators() {
        let source = "r [ (n1, empty) | ] => [ (n1, indeg(n1) + outdeg(n1)) | ] interface = {n1}";
        let rule = parse_rule(source).unwrap();
        let atom = &rule.rhs.nodes[0].label.atoms[0];
        assert!(matches!(atom, AstAtom::Add(..)));
    }

    #[test]
    fn test_parse_condition_boolean_structure() {
        let source =
            "r (x : list) [ (n1, x) (n2, empty) | ] => [ | ] where int(x) and not edge(n1, n2)";
        let rule = parse_rule(source).unwrap();
        match rule.condition.unwrap() {
            AstCondition::And(left, right) => {
                assert_eq!(*left, AstCondition::IntCheck("x".into()));
                assert!(matches!(*right, AstCondition::Not(_)));
            }
            other => panic!("expected a conjunction, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_edge_predicate_with_label() {
        let source = "r [ (n1, empty) (n2, empty) | ] => [ | ] where edge(n1, n2, 5 # red)";
        let rule = parse_rule(source).unwrap();
        match rule.condition.unwrap() {
            AstCondition::EdgePred {
                source,
                target,
                label,
            } => {
                assert_eq!(source, "n1");
                assert_eq!(target, "n2");
                let label = label.unwrap();
                assert_eq!(label.mark, Mark::Red);
                assert_eq!(label.atoms, vec![AstAtom::Integer(5)]);
            }
            other => panic!("expected an edge predicate, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_relational_conditions() {
        let source = "r (x, y : int) [ | ] => [ | ] where x > y or x : 1 = y : 2";
        let rule = parse_rule(source).unwrap();
        match rule.condition.unwrap() {
            AstCondition::Or(left, right) => {
                assert!(matches!(*left, AstCondition::Greater(..)));
                match *right {
                    AstCondition::Equal(l, r) => {
                        assert_eq!(l.len(), 2);
                        assert_eq!(r.len(), 2);
                    }
                    other => panic!("expected list equality, got {other:?}"),
                }
            }
            other => panic!("expected a disjunction, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_multiple_rules_and_comments() {
        let source = "// two trivial rules\nr1 [ | ] => [ | ]\n// second\nr2 [ | ] => [ | ]";
        let decls = parse_program(source).unwrap();
        assert_eq!(decls.len(), 2);
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = parse_rule("r [ (n1, empty | ] => [ | ]").unwrap_err();
        assert!(err.contains("line 1"), "unexpected message: {err}");
    }

    #[test]
    fn test_parse_error_on_unknown_mark() {
        let err = parse_rule("r [ (n1, 1 # cyan) | ] => [ | ]").unwrap_err();
        assert!(err.contains("unknown mark"), "unexpected message: {err}");
    }

    #[test]
    fn test_parse_comparison_rejects_lists() {
        let err = parse_rule("r (x : int) [ | ] => [ | ] where x : 1 > 2").unwrap_err();
        assert!(err.contains("single atoms"), "unexpected message: {err}");
    }
}
