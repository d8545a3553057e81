//! Boolean access expressions.
//!
//! Supported syntax:
//! - Boolean operators: `and` / `&&`, `or` / `||`, `not` / `!`
//! - Grouping with parentheses
//! - Literals: `true`, `false`, `'strings'`, `"strings"`
//! - Predicates: `permitAll`, `denyAll`, `isAuthenticated()`,
//!   `isAnonymous()`, `hasAuthority('X')`, `hasAnyAuthority('X', ...)`,
//!   `hasRole('X')`, `hasAnyRole('X', ...)`
//! - String comparison with `==` / `!=` between literals, path variables
//!   (`#id`) and the principal name (`principal`, `authentication.name`)
//!
//! Everything that can be wrong with an expression is reported by
//! [`ExpressionEvaluator::compile`]; evaluation always yields a boolean.
//! Parentheses and `not` may nest at most [`MAX_NESTING`] deep.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::authority::{Authority, AuthoritySet, Identity};
use crate::context::{LazyIdentity, MatchContext};
use crate::hierarchy::RoleHierarchy;

/// An expression that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ExpressionError(String);

impl ExpressionError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

type ParseResult<T> = Result<T, ExpressionError>;

// ─── AST ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Const(bool),
    /// `isAuthenticated()` when true, `isAnonymous()` when false.
    Authenticated(bool),
    /// Any of these authorities, after hierarchy expansion.
    AnyAuthority(Vec<Authority>),
    Compare {
        negate: bool,
        left: Operand,
        right: Operand,
    },
    Not(Box<Expr>),
    /// Operands of a chain such as `a and b and c`, kept flat so long
    /// chains do not deepen the tree.
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Literal(String),
    Variable(String),
    Principal,
}

/// A parsed primary: either already boolean, or a string-valued operand
/// that must appear in a comparison.
enum Term {
    Bool(Expr),
    Value(Operand),
}

// ─── Tokenizer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Var(String),
    True,
    False,
    LParen,
    RParen,
    Comma,
    Eq,
    Ne,
    And,
    Or,
    Not,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "`{name}`"),
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Var(name) => write!(f, "`#{name}`"),
            Self::True => f.write_str("`true`"),
            Self::False => f.write_str("`false`"),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
            Self::Comma => f.write_str("`,`"),
            Self::Eq => f.write_str("`==`"),
            Self::Ne => f.write_str("`!=`"),
            Self::And => f.write_str("`and`"),
            Self::Or => f.write_str("`or`"),
            Self::Not => f.write_str("`not`"),
        }
    }
}

fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let next_is = |i: usize, c: char| chars.get(i + 1) == Some(&c);

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' if next_is(i, '=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if next_is(i, '=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '&' if next_is(i, '&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next_is(i, '|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            quote @ ('\'' | '"') => {
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(ExpressionError::new("unterminated string literal"));
                        }
                        Some('\\') => {
                            if let Some(&escaped) = chars.get(i + 1) {
                                s.push(escaped);
                            }
                            i += 2;
                        }
                        Some(&c) if c == quote => {
                            i += 1;
                            break;
                        }
                        Some(&c) => {
                            s.push(c);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            '#' => {
                i += 1;
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '-')
                {
                    i += 1;
                }
                if start == i {
                    return Err(ExpressionError::new("expected variable name after `#`"));
                }
                tokens.push(Token::Var(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    w if w.eq_ignore_ascii_case("and") => Token::And,
                    w if w.eq_ignore_ascii_case("or") => Token::Or,
                    w if w.eq_ignore_ascii_case("not") => Token::Not,
                    _ => Token::Ident(word),
                };
                tokens.push(token);
            }
            c => {
                return Err(ExpressionError::new(format!("unexpected character `{c}`")));
            }
        }
    }

    Ok(tokens)
}

// ─── Parser ─────────────────────────────────────────────────────────────

/// Deepest allowed nesting of parentheses and `not`.
pub const MAX_NESTING: usize = 128;

struct Parser<'p> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    role_prefix: &'p str,
}

impl<'p> Parser<'p> {
    fn new(tokens: Vec<Token>, role_prefix: &'p str) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            role_prefix,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect_rparen(&mut self) -> ParseResult<()> {
        match self.advance() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(ExpressionError::new(format!(
                "expected closing parenthesis `)`, found {other}"
            ))),
            None => Err(ExpressionError::new("missing closing parenthesis `)`")),
        }
    }

    /// Runs a recursive production one level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(ExpressionError::new(format!(
                "expression nests deeper than {MAX_NESTING} levels"
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// or = and ("or" and)*
    fn parse_or(&mut self) -> ParseResult<Expr> {
        let first = self.parse_and()?;
        if self.peek() != Some(&Token::Or) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek() == Some(&Token::Or) {
            self.advance();
            operands.push(self.parse_and()?);
        }
        Ok(Expr::Or(operands))
    }

    /// and = unary ("and" unary)*
    fn parse_and(&mut self) -> ParseResult<Expr> {
        let first = self.parse_unary()?;
        if self.peek() != Some(&Token::And) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek() == Some(&Token::And) {
            self.advance();
            operands.push(self.parse_unary()?);
        }
        Ok(Expr::And(operands))
    }

    /// unary = "not" unary | comparison
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let expr = self.nested(Self::parse_unary)?;
            return Ok(Expr::Not(Box::new(expr)));
        }
        self.parse_comparison()
    }

    /// comparison = primary (("==" | "!=") primary)?
    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_primary()?;
        let negate = match self.peek() {
            Some(Token::Eq) => false,
            Some(Token::Ne) => true,
            _ => return require_bool(left),
        };
        self.advance();
        let right = self.parse_primary()?;

        match (left, right) {
            (Term::Value(left), Term::Value(right)) => Ok(Expr::Compare {
                negate,
                left,
                right,
            }),
            _ => Err(ExpressionError::new(
                "comparison operands must be strings, variables or the principal name",
            )),
        }
    }

    /// primary = "(" or ")" | call | literal | variable | property
    fn parse_primary(&mut self) -> ParseResult<Term> {
        match self.advance() {
            Some(Token::LParen) => {
                let expr = self.nested(Self::parse_or)?;
                self.expect_rparen()?;
                Ok(Term::Bool(expr))
            }
            Some(Token::True) => Ok(Term::Bool(Expr::Const(true))),
            Some(Token::False) => Ok(Term::Bool(Expr::Const(false))),
            Some(Token::Str(s)) => Ok(Term::Value(Operand::Literal(s))),
            Some(Token::Var(name)) => Ok(Term::Value(Operand::Variable(name))),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.advance();
                    let args = self.parse_args(&name)?;
                    self.call(&name, args).map(Term::Bool)
                } else {
                    self.property(&name)
                }
            }
            Some(other) => Err(ExpressionError::new(format!("unexpected token {other}"))),
            None => Err(ExpressionError::new("unexpected end of expression")),
        }
    }

    /// args = [string ("," string)*] ")"
    fn parse_args(&mut self, function: &str) -> ParseResult<Vec<String>> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.advance();
            return Ok(args);
        }

        loop {
            match self.advance() {
                Some(Token::Str(s)) => args.push(s),
                Some(other) => {
                    return Err(ExpressionError::new(format!(
                        "arguments to `{function}` must be quoted strings, found {other}"
                    )));
                }
                None => {
                    return Err(ExpressionError::new(format!(
                        "unterminated argument list for `{function}`"
                    )));
                }
            }
            match self.advance() {
                Some(Token::Comma) => {}
                Some(Token::RParen) => return Ok(args),
                Some(other) => {
                    return Err(ExpressionError::new(format!(
                        "expected `,` or `)` in arguments to `{function}`, found {other}"
                    )));
                }
                None => return Err(ExpressionError::new("missing closing parenthesis `)`")),
            }
        }
    }

    fn property(&self, name: &str) -> ParseResult<Term> {
        match name {
            "permitAll" => Ok(Term::Bool(Expr::Const(true))),
            "denyAll" => Ok(Term::Bool(Expr::Const(false))),
            "principal" | "authentication.name" => Ok(Term::Value(Operand::Principal)),
            _ => Err(ExpressionError::new(format!("unknown identifier `{name}`"))),
        }
    }

    fn call(&self, name: &str, args: Vec<String>) -> ParseResult<Expr> {
        match name {
            "permitAll" => arity(name, &args, 0).map(|()| Expr::Const(true)),
            "denyAll" => arity(name, &args, 0).map(|()| Expr::Const(false)),
            "isAuthenticated" => arity(name, &args, 0).map(|()| Expr::Authenticated(true)),
            "isAnonymous" => arity(name, &args, 0).map(|()| Expr::Authenticated(false)),
            "hasAuthority" => {
                arity(name, &args, 1)?;
                authorities(name, args).map(Expr::AnyAuthority)
            }
            "hasAnyAuthority" => {
                at_least_one(name, &args)?;
                authorities(name, args).map(Expr::AnyAuthority)
            }
            "hasRole" => {
                arity(name, &args, 1)?;
                let roles = args.into_iter().map(|r| self.role(r)).collect();
                authorities(name, roles).map(Expr::AnyAuthority)
            }
            "hasAnyRole" => {
                at_least_one(name, &args)?;
                let roles = args.into_iter().map(|r| self.role(r)).collect();
                authorities(name, roles).map(Expr::AnyAuthority)
            }
            _ => Err(ExpressionError::new(format!("unknown function `{name}`"))),
        }
    }

    fn role(&self, role: String) -> String {
        if role.is_empty() || role.starts_with(self.role_prefix) {
            role
        } else {
            format!("{}{role}", self.role_prefix)
        }
    }
}

fn require_bool(term: Term) -> ParseResult<Expr> {
    match term {
        Term::Bool(expr) => Ok(expr),
        Term::Value(_) => Err(ExpressionError::new(
            "expected a boolean expression, found a string value",
        )),
    }
}

fn arity(function: &str, args: &[String], expected: usize) -> ParseResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExpressionError::new(format!(
            "`{function}` takes {expected} argument(s), got {}",
            args.len()
        )))
    }
}

fn at_least_one(function: &str, args: &[String]) -> ParseResult<()> {
    if args.is_empty() {
        Err(ExpressionError::new(format!(
            "`{function}` takes at least one argument"
        )))
    } else {
        Ok(())
    }
}

fn authorities(function: &str, args: Vec<String>) -> ParseResult<Vec<Authority>> {
    if args.iter().any(|a| a.trim().is_empty()) {
        return Err(ExpressionError::new(format!(
            "`{function}` arguments must not be blank"
        )));
    }
    Ok(args.into_iter().map(Authority::from).collect())
}

// ─── Compiler / evaluator ───────────────────────────────────────────────

/// Compiles access expressions against a fixed role hierarchy.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use warden_authz::{
///     ExpressionEvaluator, Identity, LazyIdentity, MatchContext, RequestContext, RoleHierarchy,
/// };
/// use warden_router::PathVariables;
///
/// let hierarchy = Arc::new(RoleHierarchy::from_hierarchy("ROLE_ADMIN > ROLE_USER").unwrap());
/// let evaluator = ExpressionEvaluator::new(hierarchy, "ROLE");
///
/// let expr = evaluator.compile("hasRole('USER') and hasAuthority('VERIFIED')").unwrap();
///
/// let request = RequestContext::get("/user/42");
/// let vars = PathVariables::new();
/// let ctx = MatchContext::new(&request, &vars);
///
/// let admin = Identity::authenticated("root").with_authority("ROLE_ADMIN");
/// assert!(!expr.evaluate(&mut LazyIdentity::resolved(&admin), &ctx));
///
/// let verified = admin.clone().with_authority("VERIFIED");
/// assert!(expr.evaluate(&mut LazyIdentity::resolved(&verified), &ctx));
/// ```
#[derive(Debug, Clone)]
pub struct ExpressionEvaluator {
    hierarchy: Arc<RoleHierarchy>,
    role_authority_prefix: String,
}

impl ExpressionEvaluator {
    /// Creates an evaluator.
    ///
    /// `role_prefix` is the role convention (e.g. `ROLE`); `hasRole('X')`
    /// tests `ROLE_X` unless the argument already carries the prefix.
    pub fn new(hierarchy: Arc<RoleHierarchy>, role_prefix: &str) -> Self {
        let role_authority_prefix = if role_prefix.is_empty() || role_prefix.ends_with('_') {
            role_prefix.to_string()
        } else {
            format!("{role_prefix}_")
        };
        Self {
            hierarchy,
            role_authority_prefix,
        }
    }

    /// Parses and validates an expression.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] for syntax errors, unknown functions or
    /// identifiers, wrong argument counts, and expressions that are not
    /// boolean.
    pub fn compile(&self, source: &str) -> Result<CompiledExpression, ExpressionError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExpressionError::new("expression is empty"));
        }

        let mut parser = Parser::new(tokens, &self.role_authority_prefix);
        let expr = parser.parse_or()?;
        if let Some(trailing) = parser.peek() {
            return Err(ExpressionError::new(format!(
                "unexpected trailing token {trailing}"
            )));
        }

        Ok(CompiledExpression {
            source: source.trim().to_string(),
            expr,
            hierarchy: Arc::clone(&self.hierarchy),
        })
    }
}

/// A validated expression, ready to evaluate.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    expr: Expr,
    hierarchy: Arc<RoleHierarchy>,
}

impl CompiledExpression {
    /// The expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether evaluation can consult the identity at all.
    pub fn uses_identity(&self) -> bool {
        expr_uses_identity(&self.expr)
    }

    /// Evaluates the expression.
    ///
    /// The identity is only resolved if a predicate that needs it is
    /// actually reached; `and` / `or` short-circuit.
    pub fn evaluate<F>(&self, identity: &mut LazyIdentity<'_, F>, ctx: &MatchContext<'_, '_>) -> bool
    where
        F: FnOnce() -> Identity,
    {
        Evaluation {
            hierarchy: &self.hierarchy,
            identity,
            expanded: None,
            ctx,
        }
        .eval(&self.expr)
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn expr_uses_identity(expr: &Expr) -> bool {
    match expr {
        Expr::Const(_) => false,
        Expr::Authenticated(_) | Expr::AnyAuthority(_) => true,
        Expr::Compare { left, right, .. } => {
            matches!(left, Operand::Principal) || matches!(right, Operand::Principal)
        }
        Expr::Not(inner) => expr_uses_identity(inner),
        Expr::And(operands) | Expr::Or(operands) => operands.iter().any(expr_uses_identity),
    }
}

struct Evaluation<'e, 'i, 'c, F> {
    hierarchy: &'e RoleHierarchy,
    identity: &'e mut LazyIdentity<'i, F>,
    /// Hierarchy expansion, computed on first authority check.
    expanded: Option<AuthoritySet>,
    ctx: &'e MatchContext<'e, 'c>,
}

impl<F> Evaluation<'_, '_, '_, F>
where
    F: FnOnce() -> Identity,
{
    fn eval(&mut self, expr: &Expr) -> bool {
        match expr {
            Expr::Const(value) => *value,
            Expr::Authenticated(expected) => self.identity.get().is_authenticated() == *expected,
            Expr::AnyAuthority(required) => {
                let granted = self.authorities();
                required.iter().any(|a| granted.contains(a))
            }
            Expr::Compare {
                negate,
                left,
                right,
            } => match (self.operand(left), self.operand(right)) {
                (Some(l), Some(r)) => (l == r) != *negate,
                _ => false,
            },
            Expr::Not(inner) => !self.eval(inner),
            Expr::And(operands) => operands.iter().all(|e| self.eval(e)),
            Expr::Or(operands) => operands.iter().any(|e| self.eval(e)),
        }
    }

    fn authorities(&mut self) -> &AuthoritySet {
        let hierarchy = self.hierarchy;
        let identity = &mut *self.identity;
        self.expanded
            .get_or_insert_with(|| hierarchy.expand(identity.get().authorities()))
    }

    fn operand(&mut self, operand: &Operand) -> Option<String> {
        match operand {
            Operand::Literal(s) => Some(s.clone()),
            Operand::Variable(name) => self.ctx.variable(name).map(str::to_string),
            Operand::Principal => self.identity.get().name().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use std::cell::Cell;
    use warden_router::PathVariables;

    fn evaluator() -> ExpressionEvaluator {
        let hierarchy = RoleHierarchy::from_hierarchy("ROLE_ADMIN > ROLE_USER").unwrap();
        ExpressionEvaluator::new(Arc::new(hierarchy), "ROLE")
    }

    fn eval_with(source: &str, identity: &Identity, vars: &[(&str, &str)]) -> bool {
        let expr = evaluator().compile(source).unwrap();
        let request = RequestContext::get("/test");
        let vars: PathVariables = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let ctx = MatchContext::new(&request, &vars);
        expr.evaluate(&mut LazyIdentity::resolved(identity), &ctx)
    }

    fn eval(source: &str, identity: &Identity) -> bool {
        eval_with(source, identity, &[])
    }

    fn user() -> Identity {
        Identity::authenticated("alice").with_authorities(["ROLE_USER", "VERIFIED"])
    }

    fn admin() -> Identity {
        Identity::authenticated("root").with_authority("ROLE_ADMIN")
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("hasRole('A') && !#id == \"x\"").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("hasRole".into()),
                Token::LParen,
                Token::Str("A".into()),
                Token::RParen,
                Token::And,
                Token::Not,
                Token::Var("id".into()),
                Token::Eq,
                Token::Str("x".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_escaped_quote() {
        let tokens = tokenize(r"'it\'s'").unwrap();
        assert_eq!(tokens, vec![Token::Str("it's".into())]);
    }

    #[test]
    fn test_constants() {
        let anon = Identity::anonymous();
        assert!(eval("permitAll", &anon));
        assert!(eval("permitAll()", &anon));
        assert!(!eval("denyAll", &anon));
        assert!(!eval("denyAll()", &anon));
        assert!(eval("true", &anon));
        assert!(!eval("false", &anon));
    }

    #[test]
    fn test_authentication_state() {
        assert!(eval("isAuthenticated()", &user()));
        assert!(!eval("isAuthenticated()", &Identity::anonymous()));
        assert!(eval("isAnonymous()", &Identity::anonymous()));
        assert!(!eval("isAnonymous()", &user()));
    }

    #[test]
    fn test_has_authority_uses_hierarchy() {
        assert!(eval("hasAuthority('ROLE_USER')", &admin()));
        assert!(!eval("hasAuthority('VERIFIED')", &admin()));
        assert!(eval("hasAnyAuthority('NOPE', 'VERIFIED')", &user()));
        assert!(!eval("hasAnyAuthority('NOPE', 'ALSO_NOPE')", &user()));
    }

    #[test]
    fn test_has_role_adds_prefix() {
        assert!(eval("hasRole('USER')", &user()));
        assert!(eval("hasRole('ROLE_USER')", &user()));
        assert!(eval("hasRole('USER')", &admin()));
        assert!(!eval("hasRole('ADMIN')", &user()));
        assert!(eval("hasAnyRole('ADMIN', 'USER')", &user()));
    }

    #[test]
    fn test_boolean_operators_and_precedence() {
        assert!(eval("hasRole('USER') and hasAuthority('VERIFIED')", &user()));
        assert!(!eval("hasRole('USER') && hasAuthority('VERIFIED')", &admin()));
        assert!(eval("hasRole('ADMIN') or hasAuthority('VERIFIED')", &user()));
        assert!(eval("not hasRole('ADMIN')", &user()));
        assert!(eval("!denyAll", &user()));
        // and binds tighter than or
        assert!(eval("permitAll or denyAll and denyAll", &user()));
        assert!(!eval("(permitAll or denyAll) and denyAll", &user()));
        assert!(eval("NOT denyAll AND permitAll", &user()));
    }

    #[test]
    fn test_comparisons() {
        let vars = [("id", "42")];
        assert!(eval_with("#id == '42'", &user(), &vars));
        assert!(!eval_with("#id != '42'", &user(), &vars));
        assert!(eval_with("#id != '7'", &user(), &vars));
        assert!(eval_with("'42' == #id", &user(), &vars));
        assert!(eval("principal == 'alice'", &user()));
        assert!(eval("authentication.name == 'alice'", &user()));
    }

    #[test]
    fn test_missing_operands_are_false() {
        assert!(!eval("#missing == 'x'", &user()));
        assert!(!eval("#missing != 'x'", &user()));
        assert!(!eval("principal == 'alice'", &Identity::anonymous()));
        assert!(!eval("principal != 'alice'", &Identity::anonymous()));
    }

    #[test]
    fn test_lazy_identity_not_resolved_when_unused() {
        let evaluator = evaluator();
        let request = RequestContext::get("/user/42");
        let mut vars = PathVariables::new();
        vars.push("id", "42");
        let ctx = MatchContext::new(&request, &vars);

        for source in ["permitAll", "#id == '42'", "permitAll or hasRole('USER')"] {
            let calls = Cell::new(0);
            let mut identity = LazyIdentity::new(|| {
                calls.set(calls.get() + 1);
                user()
            });
            let expr = evaluator.compile(source).unwrap();
            assert!(expr.evaluate(&mut identity, &ctx), "{source}");
            assert_eq!(calls.get(), 0, "{source} resolved the identity");
        }

        let calls = Cell::new(0);
        let mut identity = LazyIdentity::new(|| {
            calls.set(calls.get() + 1);
            user()
        });
        let expr = evaluator
            .compile("hasRole('USER') and isAuthenticated() and principal == 'alice'")
            .unwrap();
        assert!(expr.evaluate(&mut identity, &ctx));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_uses_identity() {
        let evaluator = evaluator();
        assert!(!evaluator.compile("permitAll").unwrap().uses_identity());
        assert!(!evaluator.compile("#a == 'b'").unwrap().uses_identity());
        assert!(evaluator.compile("principal == 'b'").unwrap().uses_identity());
        assert!(evaluator
            .compile("permitAll and not isAnonymous()")
            .unwrap()
            .uses_identity());
    }

    #[test]
    fn test_compile_errors() {
        let evaluator = evaluator();
        let cases = [
            ("", "empty"),
            ("   ", "empty"),
            ("hasPermission('x')", "unknown function"),
            ("whatever", "unknown identifier"),
            ("hasAuthority()", "takes 1"),
            ("hasAuthority('A', 'B')", "takes 1"),
            ("hasRole()", "takes 1"),
            ("hasAnyAuthority()", "at least one"),
            ("isAuthenticated('x')", "takes 0"),
            ("hasAuthority('')", "blank"),
            ("hasAuthority(ROLE_X)", "quoted strings"),
            ("'just a string'", "boolean"),
            ("#id", "boolean"),
            ("(permitAll", "closing parenthesis"),
            ("permitAll)", "trailing"),
            ("permitAll permitAll", "trailing"),
            ("hasRole('A'", "closing parenthesis"),
            ("hasRole('A' 'B')", "expected `,` or `)`"),
            ("isAuthenticated() == 'x'", "comparison operands"),
            ("'unterminated", "unterminated"),
            ("permitAll and", "end of expression"),
            ("# == 'x'", "variable name"),
            ("a = b", "unexpected character"),
        ];

        for (source, expected) in cases {
            let err = evaluator.compile(source).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "`{source}` gave `{err}`, expected `{expected}`"
            );
        }
    }

    #[test]
    fn test_source_is_trimmed() {
        let expr = evaluator().compile("  permitAll  ").unwrap();
        assert_eq!(expr.source(), "permitAll");
        assert_eq!(expr.to_string(), "permitAll");
    }

    #[test]
    fn test_role_prefix_with_trailing_underscore() {
        let evaluator = ExpressionEvaluator::new(Arc::new(RoleHierarchy::new()), "GROUP_");
        let expr = evaluator.compile("hasRole('OPS')").unwrap();
        let id = Identity::authenticated("x").with_authority("GROUP_OPS");
        let request = RequestContext::get("/");
        let vars = PathVariables::new();
        let ctx = MatchContext::new(&request, &vars);
        assert!(expr.evaluate(&mut LazyIdentity::resolved(&id), &ctx));
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = format!("{}permitAll", "!".repeat(MAX_NESTING));
        assert!(evaluator().compile(&at_limit).is_ok());

        let err = evaluator()
            .compile(&format!("{}permitAll", "!".repeat(200_000)))
            .unwrap_err();
        assert!(err.to_string().contains("nests deeper"));

        let parens = format!("{}permitAll{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(evaluator().compile(&parens).is_err());
    }

    #[test]
    fn test_long_chains_stay_flat() {
        let chain = vec!["hasRole('USER')"; 20_000].join(" and ");
        assert!(eval(&chain, &user()));
        assert!(!eval(&chain, &Identity::anonymous()));

        let chain = vec!["denyAll"; 20_000].join(" or ") + " or permitAll";
        assert!(eval(&chain, &Identity::anonymous()));
    }
}
