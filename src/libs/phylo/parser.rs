use super::error::TreeError;
use super::node::NodeId;
use super::tree::Tree;
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map, map_res, opt, recognize},
    error::{context, ContextError, ErrorKind, FromExternalError, ParseError},
    multi::{many1, separated_list1},
    sequence::{delimited, preceded},
    IResult, Offset, Parser,
};

// ================================================================================================
// Errors
// ================================================================================================

#[derive(Clone, Debug, PartialEq)]
enum Frame {
    Context(&'static str),
    Nom(ErrorKind),
}

/// nom error that keeps the whole stack of contexts, so a failure can be reported
/// as "while parsing children / while parsing length / ...".
#[derive(Clone, Debug, PartialEq)]
struct NewickError<'a> {
    frames: Vec<(&'a str, Frame)>,
}

impl<'a> ParseError<&'a str> for NewickError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        NewickError {
            frames: vec![(input, Frame::Nom(kind))],
        }
    }

    fn append(input: &'a str, kind: ErrorKind, mut other: Self) -> Self {
        other.frames.push((input, Frame::Nom(kind)));
        other
    }
}

impl<'a> ContextError<&'a str> for NewickError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.frames.push((input, Frame::Context(ctx)));
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for NewickError<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        NewickError {
            frames: vec![(input, Frame::Nom(kind))],
        }
    }
}

type PResult<'a, O> = IResult<&'a str, O, NewickError<'a>>;

// ================================================================================================
// Intermediate structure
// ================================================================================================

/// Recursive form of a parsed clade, flattened into the `Tree` arena afterwards.
#[derive(Debug, Default)]
struct Clade {
    name: Option<String>,
    length: Option<f64>,
    children: Vec<Clade>,
}

impl Clade {
    /// Move this clade into the arena and return the id of its top node.
    fn into_arena(self, tree: &mut Tree) -> Result<NodeId, TreeError> {
        let id = tree.add_node();
        for child in self.children {
            let child_id = child.into_arena(tree)?;
            tree.add_child(id, child_id).map_err(TreeError::LogicError)?;
        }
        if let Some(node) = tree.get_node_mut(id) {
            node.name = self.name;
            node.length = self.length;
        }
        Ok(id)
    }

    fn into_tree(self) -> Result<Tree, TreeError> {
        let mut tree = Tree::new();
        let root = self.into_arena(&mut tree)?;
        tree.set_root(root);
        Ok(tree)
    }
}

// ================================================================================================
// Grammar
// ================================================================================================

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

// Labels: 'single quoted' and "double quoted" (doubled quote is an escaped quote),
// or unquoted text up to the next structural character.
fn label(input: &str) -> PResult<'_, String> {
    let unquoted = map(take_while(|c: char| !"():;,[]".contains(c)), |s: &str| {
        s.trim().to_string()
    });
    let single_quoted = delimited(
        char('\''),
        map(is_not("'"), |s: &str| s.replace("''", "'")),
        char('\''),
    );
    let double_quoted = delimited(
        char('"'),
        map(is_not("\""), |s: &str| s.replace("\"\"", "\"")),
        char('"'),
    );

    context("label", alt((single_quoted, double_quoted, unquoted))).parse(input)
}

// ":0.1", ":-2", ":1e-3"
fn length(input: &str) -> PResult<'_, f64> {
    context(
        "length",
        preceded(
            ws(char(':')),
            cut(map_res(
                recognize((
                    opt(char('-')),
                    digit1,
                    opt((char('.'), digit1)),
                    opt((
                        alt((char('e'), char('E'))),
                        opt(alt((char('+'), char('-')))),
                        digit1,
                    )),
                )),
                |s: &str| s.parse::<f64>(),
            )),
        ),
    )
    .parse(input)
}

// Bracketed comments (including NHX annotations) carry nothing a block tree needs.
fn comment(input: &str) -> PResult<'_, ()> {
    context(
        "comment",
        map(opt(delimited(ws(char('[')), is_not("]"), char(']'))), |_| ()),
    )
    .parse(input)
}

// (child, child, ...)label[comment]:length[comment]
fn clade(input: &str) -> PResult<'_, Clade> {
    let (input, children) = context(
        "children",
        opt(delimited(
            ws(char('(')),
            separated_list1(ws(char(',')), clade),
            ws(char(')')),
        )),
    )
    .parse(input)?;

    let (input, name) = opt(label).parse(input)?;
    let (input, _) = comment(input)?;
    let (input, length) = opt(length).parse(input)?;
    let (input, _) = comment(input)?;

    Ok((
        input,
        Clade {
            name: name.filter(|s| !s.is_empty()),
            length,
            children: children.unwrap_or_default(),
        },
    ))
}

// ================================================================================================
// Entry points
// ================================================================================================

/// Parse exactly one Newick tree terminated by `;`.
pub fn parse_newick(input: &str) -> Result<Tree, TreeError> {
    match (ws(clade), ws(char(';'))).parse(input) {
        Ok((_, (top, _))) => top.into_tree(),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(to_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(incomplete()),
    }
}

/// Parse every tree in the input. Top-level `[...]` blocks between trees are skipped.
pub fn parse_newick_multi(input: &str) -> Result<Vec<Tree>, TreeError> {
    let tree = map((ws(clade), ws(char(';'))), |(top, _)| Some(top));
    let header = map(
        ws(delimited(char('['), take_while(|c| c != ']'), char(']'))),
        |_| None,
    );

    match many1(alt((tree, header))).parse(input) {
        Ok((_, items)) => items.into_iter().flatten().map(Clade::into_tree).collect(),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(to_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(incomplete()),
    }
}

fn incomplete() -> TreeError {
    TreeError::ParseError {
        message: "Incomplete input".to_string(),
        line: 0,
        column: 0,
        snippet: String::new(),
    }
}

fn to_tree_error(input: &str, e: NewickError) -> TreeError {
    let remaining = e.frames.first().map(|(rest, _)| *rest).unwrap_or(input);
    let offset = input.offset(remaining);

    let prefix = &input[..offset];
    let line = prefix.chars().filter(|&c| c == '\n').count() + 1;
    let line_start = prefix.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let column = offset - line_start + 1;

    let mut message = String::new();
    for (_, frame) in e.frames.iter().rev() {
        match frame {
            Frame::Context(ctx) => message.push_str(&format!("while parsing {}:\n", ctx)),
            Frame::Nom(kind) => message.push_str(&format!("  error: {:?}\n", kind)),
        }
    }

    TreeError::ParseError {
        message,
        line,
        column,
        snippet: remaining.chars().take(50).collect(),
    }
}

impl Tree {
    /// Parse a Newick string into a Tree.
    ///
    /// # Example
    /// ```
    /// use mof::libs::phylo::Tree;
    ///
    /// let tree = Tree::from_newick("(A:0.1,B:0.2)Root;").unwrap();
    /// assert_eq!(tree.len(), 3);
    ///
    /// assert!(Tree::from_newick("(A,B:invalid)C;").is_err());
    /// ```
    pub fn from_newick(input: &str) -> Result<Self, TreeError> {
        parse_newick(input)
    }

    pub fn from_newick_multi(input: &str) -> Result<Vec<Self>, TreeError> {
        parse_newick_multi(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_names(tree: &Tree, id: NodeId) -> Vec<Option<String>> {
        tree.get_node(id)
            .unwrap()
            .children
            .iter()
            .map(|&c| tree.get_node(c).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn test_parser_simple() {
        let tree = Tree::from_newick("(A,B)C;").unwrap();
        assert_eq!(tree.len(), 3);

        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.label(), Some("C"));
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_parser_nested_labels_keep_order() {
        let tree = Tree::from_newick("(A,(C,D)B,E)R;").unwrap();
        let root = tree.get_root().unwrap();
        assert_eq!(
            child_names(&tree, root),
            vec![Some("A".into()), Some("B".into()), Some("E".into())]
        );
        let b = tree.get_node_by_name("B").unwrap();
        assert_eq!(child_names(&tree, b), vec![Some("C".into()), Some("D".into())]);
    }

    #[test]
    fn test_parser_lengths_and_comments() {
        let tree = Tree::from_newick("(A:0.1[&&NHX:S=x], B:0.2e-1)Root:100;").unwrap();
        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.length, Some(100.0));

        let a = tree.get_node(root.children[0]).unwrap();
        assert_eq!(a.label(), Some("A"));
        assert_eq!(a.length, Some(0.1));
        let b = tree.get_node(root.children[1]).unwrap();
        assert_eq!(b.length, Some(0.02));
    }

    #[test]
    fn test_parser_whitespace_and_quotes() {
        let input = "
        (
            'Homo sapiens' : 0.1,
            \"Mus musculus\",
            O''Brien
        ) Root ;
        ";
        let tree = Tree::from_newick(input).unwrap();
        let root = tree.get_root().unwrap();
        assert_eq!(
            child_names(&tree, root),
            vec![
                Some("Homo sapiens".into()),
                Some("Mus musculus".into()),
                Some("O''Brien".into())
            ]
        );
    }

    #[test]
    fn test_parser_unlabeled_nodes() {
        let tree = Tree::from_newick("((A,B),C);").unwrap();
        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.name, None);
        assert_eq!(tree.get_node(root.children[0]).unwrap().name, None);
    }

    #[test]
    fn test_parser_multi() {
        let trees = Tree::from_newick_multi("[header](A,B)X;\n(C,D)Y;\n").unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[1].get_node_by_name("Y"), trees[1].get_root());
    }

    #[test]
    fn test_parser_error() {
        match Tree::from_newick("(A,B)C") {
            Err(TreeError::ParseError { line, column, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 7);
            }
            res => panic!("Expected ParseError, got {:?}", res),
        }

        match Tree::from_newick("(A,\nB:invalid)C;") {
            Err(TreeError::ParseError { line, message, .. }) => {
                assert_eq!(line, 2);
                assert!(message.contains("length"));
            }
            res => panic!("Expected ParseError, got {:?}", res),
        }
    }
}
