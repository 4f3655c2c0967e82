use std::collections::BTreeSet;

use crowbook_text_processing::escape;
use serde::Serialize;

use super::{
    ll1_parser::{NodeId, ParseTree},
    lr_dfa::{DotProduction, LRItem, LRParsingTableAction, SLRParsingTable, LRFSM},
    Grammar, EPSILON,
};
use crate::error::GrammarError;

fn align(output: &[Vec<String>]) -> String {
    let width: Vec<usize> = (0..output[0].len())
        .map(|j| output.iter().map(|row| row[j].chars().count()).max().unwrap_or(0))
        .collect();
    output
        .iter()
        .map(|line| {
            line.iter()
                .enumerate()
                .map(|(i, s)| format!("{:>width$}", s, width = width[i]))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tex_symbols(symbols: &[&str]) -> String {
    symbols
        .iter()
        .map(|s| escape::tex(*s))
        .collect::<Vec<_>>()
        .join(r"\ ")
        .replace(EPSILON, r"\epsilon")
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionOutput<'a> {
    pub left: &'a str,
    /// (ordinal, right side)
    pub rights: Vec<(usize, Vec<&'a str>)>,
}

impl ProductionOutput<'_> {
    pub fn to_plaintext(&self, left_width: usize, multiline: bool) -> String {
        self.rights
            .iter()
            .map(|(_, right)| right.join(" "))
            .enumerate()
            .map(|(i, right)| {
                if i == 0 {
                    format!("{:>width$} -> {}", self.left, right, width = left_width)
                } else if multiline {
                    format!("{:>width$}  | {}", "", right, width = left_width)
                } else {
                    format!(" | {}", right)
                }
            })
            .collect::<Vec<_>>()
            .join(if multiline { "\n" } else { "" })
    }

    pub fn to_latex(&self, and_sign: bool) -> String {
        if self.rights.is_empty() {
            return String::new();
        }

        let left = if and_sign {
            format!("{} & \\rightarrow &", escape::tex(self.left))
        } else {
            format!("{} \\rightarrow ", escape::tex(self.left))
        };
        let right = self
            .rights
            .iter()
            .map(|(_, right)| tex_symbols(right))
            .collect::<Vec<_>>()
            .join(" \\mid ");

        left + &right
    }
}

#[derive(Serialize)]
pub struct ProductionOutputVec<'a> {
    productions: Vec<ProductionOutput<'a>>,
}

impl ProductionOutputVec<'_> {
    /// One numbered line per production, so ordinals in tables and errors
    /// can be looked up.
    pub fn to_plaintext(&self) -> String {
        let left_max_len = self
            .productions
            .iter()
            .map(|p| p.left.chars().count())
            .max()
            .unwrap_or(0);
        self.productions
            .iter()
            .flat_map(|p| {
                p.rights.iter().map(move |(ordinal, right)| {
                    format!(
                        "({}) {:>width$} -> {}",
                        ordinal,
                        p.left,
                        right.join(" "),
                        width = left_max_len
                    )
                })
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        std::iter::once("\\[\\begin{array}{cll}".to_string())
            .chain(self.productions.iter().map(|s| s.to_latex(true)))
            .chain(std::iter::once("\\end{array}\\]".to_string()))
            .collect::<Vec<String>>()
            .join("\\\\\n")
    }
}

impl Grammar {
    pub fn to_production_output_vec(&self) -> ProductionOutputVec {
        let mut productions: Vec<ProductionOutput> = Vec::new();
        for (p, right) in self.productions() {
            let left = self.get_symbol_name(p.left);
            let right = (p.ordinal, self.production_to_vec_str(right));
            match productions.last_mut() {
                Some(last) if last.left == left => last.rights.push(right),
                _ => productions.push(ProductionOutput {
                    left,
                    rights: vec![right],
                }),
            }
        }
        ProductionOutputVec { productions }
    }
}

#[derive(Serialize)]
struct NonTerminalOutput<'a> {
    name: &'a str,
    nullable: bool,
    first: Vec<&'a str>,
    follow: Vec<&'a str>,
}

impl NonTerminalOutput<'_> {
    fn to_plaintext(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.name,
            self.nullable,
            self.first.join(", "),
            self.follow.join(", ")
        )
    }

    fn to_latex(&self) -> String {
        format!(
            "{} & {} & {} & {}",
            escape::tex(self.name),
            self.nullable,
            tex_symbols(&self.first),
            tex_symbols(&self.follow)
        )
    }
}

#[derive(Serialize)]
pub struct NonTerminalOutputVec<'a> {
    data: Vec<NonTerminalOutput<'a>>,
}

impl NonTerminalOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        self.data
            .iter()
            .map(|s| s.to_plaintext())
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_latex(&self) -> String {
        let content = self
            .data
            .iter()
            .map(|e| e.to_latex())
            .collect::<Vec<_>>()
            .join("\\\\\n ");

        "\\begin{tabular}{c|c|c|c}\n".to_string()
            + "Symbol & Nullable & First & Follow\\\\\\hline\n"
            + &content
            + "\\\\\n\\end{tabular}"
    }
}

impl Grammar {
    pub fn to_non_terminal_output_vec(&self) -> Result<NonTerminalOutputVec, GrammarError> {
        let mut data = Vec::new();
        let mut non_terminals: Vec<_> = self.non_terminal_iter().collect();
        non_terminals.sort_by(|a, b| a.name.cmp(&b.name));
        for nt in non_terminals {
            data.push(NonTerminalOutput {
                name: nt.name.as_str(),
                nullable: self.derives_to_empty(nt.index)?,
                first: self.names(&self.first_of(&[nt.index])?),
                follow: self.names(&self.follow_of(nt.index)?),
            });
        }
        Ok(NonTerminalOutputVec { data })
    }
}

#[derive(Serialize)]
struct PredictOutput<'a> {
    ordinal: usize,
    left: &'a str,
    right: Vec<&'a str>,
    predict: Vec<&'a str>,
}

#[derive(Serialize)]
pub struct PredictOutputVec<'a> {
    data: Vec<PredictOutput<'a>>,
}

impl PredictOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        let output: Vec<Vec<String>> = self
            .data
            .iter()
            .map(|p| {
                vec![
                    format!("({})", p.ordinal),
                    format!("{} -> {}", p.left, p.right.join(" ")),
                    p.predict.join(", "),
                ]
            })
            .collect();
        if output.is_empty() {
            return String::new();
        }
        align(&output)
    }

    pub fn to_latex(&self) -> String {
        let content = self
            .data
            .iter()
            .map(|p| {
                format!(
                    "{} & ${} \\rightarrow {}$ & {}",
                    p.ordinal,
                    escape::tex(p.left),
                    tex_symbols(&p.right),
                    tex_symbols(&p.predict)
                )
            })
            .collect::<Vec<_>>()
            .join("\\\\\n");

        "\\begin{tabular}{c|l|l}\n".to_string()
            + "\\# & Production & Predict\\\\\\hline\n"
            + &content
            + "\\\\\n\\end{tabular}"
    }
}

impl Grammar {
    pub fn to_predict_output_vec(&self) -> Result<PredictOutputVec, GrammarError> {
        let mut data = Vec::new();
        for (p, right) in self.productions() {
            data.push(PredictOutput {
                ordinal: p.ordinal,
                left: self.get_symbol_name(p.left),
                right: self.production_to_vec_str(right),
                predict: self.names(&self.predict_set(p.left, p.alternative)?),
            });
        }
        Ok(PredictOutputVec { data })
    }
}

/// Every production predicted in every cell, so conflicts show up as cells
/// with more than one entry.
#[derive(Serialize)]
pub struct LL1ParsingTableOutput<'a> {
    terminals: Vec<&'a str>,
    rows: Vec<(&'a str, Vec<ProductionOutput<'a>>)>,
}

impl LL1ParsingTableOutput<'_> {
    pub fn to_plaintext(&self) -> String {
        let mut header: Vec<String> = vec![String::new()];
        header.extend(self.terminals.iter().map(|&t| t.to_string()));
        let mut output: Vec<Vec<String>> = vec![header];
        for (left, row) in &self.rows {
            let mut line: Vec<String> = vec![left.to_string()];
            line.extend(row.iter().map(|productions| {
                productions
                    .rights
                    .iter()
                    .map(|(ordinal, _)| ordinal.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            }));
            output.push(line);
        }
        align(&output)
    }

    pub fn to_latex(&self) -> String {
        let mut header: Vec<String> = vec![format!(
            "\\[\\begin{{array}}{{c{}}}\n",
            "|l".repeat(self.terminals.len()),
        )];
        header.extend(
            self.terminals
                .iter()
                .map(|&t| format!("\\text{{{}}}", escape::tex(t))),
        );
        let header = header.join(" & ");

        let mut output: Vec<String> = Vec::new();
        for (left, row) in &self.rows {
            let mut line: Vec<String> = vec![escape::tex(*left).to_string()];
            line.extend(row.iter().map(|productions| {
                let cell = productions.to_latex(false);
                if productions.rights.len() > 1 {
                    format!("{{\\color{{red}}{}}}", cell)
                } else {
                    cell
                }
            }));
            output.push(line.join(" & "));
        }

        let output = output.join("\\\\\n");

        header + "\\\\\\hline\n" + &output + "\n\\end{array}\\]"
    }
}

impl Grammar {
    pub fn to_ll1_parsing_table_output(&self) -> Result<LL1ParsingTableOutput, GrammarError> {
        let mut terminals: Vec<usize> = self
            .terminal_iter()
            .filter_map(|t| self.get_symbol_index(t))
            .collect();
        terminals.push(self.end_mark());

        let mut rows: Vec<(&str, Vec<ProductionOutput>)> = Vec::new();
        let mut non_terminals: Vec<_> = self.non_terminal_iter().collect();
        non_terminals.sort_by(|a, b| a.name.cmp(&b.name));
        for nt in non_terminals {
            let left = nt.name.as_str();
            let mut row: Vec<ProductionOutput> = vec![
                ProductionOutput {
                    left,
                    rights: Vec::new()
                };
                terminals.len()
            ];
            for (alternative, production) in nt.productions.iter().enumerate() {
                let ordinal = self.production_ref(nt.index, alternative)?.ordinal;
                let predict: BTreeSet<usize> = self.predict_set(nt.index, alternative)?;
                for (col, t) in terminals.iter().enumerate() {
                    if predict.contains(t) {
                        row[col]
                            .rights
                            .push((ordinal, self.production_to_vec_str(production)));
                    }
                }
            }
            rows.push((left, row));
        }

        Ok(LL1ParsingTableOutput {
            terminals: terminals.iter().map(|&t| self.get_symbol_name(t)).collect(),
            rows,
        })
    }
}

#[derive(Serialize)]
pub struct ParseTreeOutput<'a> {
    symbol: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    lexeme: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<ParseTreeOutput<'a>>,
}

impl ParseTree {
    fn label<'g>(&'g self, g: &'g Grammar, id: NodeId) -> &'g str {
        self.node(id).symbol.map_or("root", |s| g.get_symbol_name(s))
    }

    fn write_plaintext(&self, g: &Grammar, id: NodeId, out: &mut String) {
        out.push_str(self.label(g, id));
        let children = self.children(id);
        if !children.is_empty() {
            out.push('(');
            for (i, &child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                self.write_plaintext(g, child, out);
            }
            out.push(')');
        }
    }

    /// `S(a S(lambda) b)` style, starting at the start symbol.
    pub fn to_plaintext(&self, g: &Grammar) -> String {
        let mut out = String::new();
        if let Some(start) = self.start() {
            self.write_plaintext(g, start, &mut out);
        }
        out
    }

    fn write_latex(&self, g: &Grammar, id: NodeId, out: &mut String) {
        let label = escape::tex(self.label(g, id)).replace(EPSILON, "$\\epsilon$");
        let children = self.children(id);
        if children.is_empty() {
            out.push_str(&format!("{{{}}}", label));
            return;
        }
        out.push_str(&format!("[.{{{}}}", label));
        for &child in children {
            out.push(' ');
            self.write_latex(g, child, out);
        }
        out.push_str(" ]");
    }

    /// A `qtree` picture.
    pub fn to_latex(&self, g: &Grammar) -> String {
        let mut out = String::from("\\Tree ");
        if let Some(start) = self.start() {
            self.write_latex(g, start, &mut out);
        }
        out
    }

    pub fn to_output<'a>(&'a self, g: &'a Grammar) -> Option<ParseTreeOutput<'a>> {
        fn build<'a>(tree: &'a ParseTree, g: &'a Grammar, id: NodeId) -> ParseTreeOutput<'a> {
            let node = tree.node(id);
            ParseTreeOutput {
                symbol: tree.label(g, id),
                lexeme: node.token.as_ref().and_then(|t| t.lexeme.as_deref()),
                children: node.children.iter().map(|&c| build(tree, g, c)).collect(),
            }
        }
        self.start().map(|start| build(self, g, start))
    }
}

impl DotProduction {
    pub fn to_plaintext(&self, g: &Grammar) -> String {
        let right = g.item_right(self.ordinal);
        let left = match g.item_left(self.ordinal) {
            Some(left) => g.get_symbol_name(left).to_string(),
            None => format!("{}'", g.get_symbol_name(g.start_symbol())),
        };

        let mut output = left;
        output.push_str(" ->");
        for (i, &s) in right.iter().enumerate() {
            output.push(' ');
            if i == self.position {
                output.push('.');
            }
            output.push_str(g.get_symbol_name(s));
        }
        if self.position == right.len() {
            output.push_str(" .");
        }
        output
    }
}

impl LRItem {
    pub fn to_plaintext(&self, g: &Grammar) -> String {
        let kernel = self
            .kernel
            .iter()
            .map(|c| c.to_plaintext(g))
            .collect::<Vec<_>>()
            .join("\n");

        let extend = if !self.extend.is_empty() {
            format!(
                "\n---\n{}",
                self.extend
                    .iter()
                    .map(|c| c.to_plaintext(g))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        } else {
            String::new()
        };

        let edges = if !self.edges.is_empty() {
            format!(
                "\n===\n{}",
                self.edges
                    .iter()
                    .map(|(&k, v)| format!("- {} -> {}", g.get_symbol_name(k), v))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        } else {
            String::new()
        };

        format!("{}{}{}", kernel, extend, edges)
    }
}

impl LRFSM {
    pub fn to_plaintext(&self, g: &Grammar) -> String {
        let states = self
            .states
            .iter()
            .enumerate()
            .map(|(i, s)| format!("I{}\n{}", i, s.to_plaintext(g)))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!("{}\n\nstart: {}", states, self.start)
    }
}

impl LRParsingTableAction {
    pub fn to_plaintext(&self) -> String {
        match self {
            LRParsingTableAction::Reduce(ordinal) => format!("r{}", ordinal),
            LRParsingTableAction::Shift(s) => format!("s{}", s),
            LRParsingTableAction::Accept => "acc".to_string(),
        }
    }

    pub fn to_latex(&self) -> String {
        match self {
            LRParsingTableAction::Reduce(ordinal) => format!("reduce {}", ordinal),
            LRParsingTableAction::Shift(s) => format!("shift {}", s),
            LRParsingTableAction::Accept => "accept".to_string(),
        }
    }
}

impl SLRParsingTable {
    fn columns(&self, g: &Grammar) -> (Vec<usize>, Vec<usize>) {
        let mut terminals: Vec<usize> = g
            .terminal_iter()
            .filter_map(|t| g.get_symbol_index(t))
            .collect();
        terminals.push(g.end_mark());
        let mut non_terminals: Vec<usize> = g.non_terminal_iter().map(|nt| nt.index).collect();
        non_terminals.sort_by_key(|&nt| g.get_symbol_name(nt));
        (terminals, non_terminals)
    }

    pub fn to_plaintext(&self, g: &Grammar) -> String {
        let (terminals, non_terminals) = self.columns(g);
        let mut output: Vec<Vec<String>> = Vec::new();

        output.push(vec![String::new()]);
        for &s in terminals.iter().chain(non_terminals.iter()) {
            output[0].push(g.get_symbol_name(s).to_string());
        }

        for (i, (r1, r2)) in self.action.iter().zip(self.goto.iter()).enumerate() {
            let row: Vec<String> = std::iter::once(i.to_string())
                .chain(terminals.iter().map(|t| {
                    r1.get(t)
                        .map(|actions| {
                            actions
                                .iter()
                                .map(|action| action.to_plaintext())
                                .collect::<Vec<_>>()
                                .join("; ")
                        })
                        .unwrap_or_default()
                }))
                .chain(
                    non_terminals
                        .iter()
                        .map(|nt| r2.get(nt).map(|v| v.to_string()).unwrap_or_default()),
                )
                .collect::<Vec<_>>();
            output.push(row);
        }

        align(&output)
    }

    pub fn to_latex(&self, g: &Grammar) -> String {
        let (terminals, non_terminals) = self.columns(g);
        let header: String = format!(
            "\\begin{{tabular}}{{c{}}}\n & \\multicolumn{{{}}}{{c}}{{action}} & \\multicolumn{{{}}}{{|c}}{{goto}}\\\\",
            "|l".repeat(terminals.len() + non_terminals.len()),
            terminals.len(),
            non_terminals.len(),
        );

        let mut first_row: Vec<String> = vec![String::new()];
        for &s in terminals.iter().chain(non_terminals.iter()) {
            first_row.push(escape::tex(g.get_symbol_name(s)).to_string());
        }
        let first_row = first_row.join(" & ");

        let mut content: Vec<String> = Vec::new();
        for (i, (r1, r2)) in self.action.iter().zip(self.goto.iter()).enumerate() {
            let mut row: Vec<String> = vec![i.to_string()];
            for t in &terminals {
                let actions = r1.get(t).map(Vec::as_slice).unwrap_or(&[]);
                let r = actions
                    .iter()
                    .map(|action| action.to_latex())
                    .collect::<Vec<_>>()
                    .join("; ");
                row.push(if actions.len() > 1 {
                    format!("{{\\color{{red}}{}}}", r)
                } else {
                    r
                });
            }
            for nt in &non_terminals {
                row.push(r2.get(nt).map(|v| v.to_string()).unwrap_or_default());
            }
            content.push(row.join(" & "));
        }

        format!(
            "{}\n{} \\\\\\hline\n{}\n\\end{{tabular}}",
            header,
            first_row,
            content.join(" \\\\\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::token::TokenStream;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbered_productions() {
        let g = Grammar::parse("S -> a S b | lambda\nA -> x").unwrap();
        assert_eq!(
            g.to_production_output_vec().to_plaintext(),
            "(1) A -> x\n(2) S -> a S b\n(3) S -> lambda"
        );
    }

    #[test]
    fn nullable_first_follow_rows() {
        let g = Grammar::parse("S -> A b\nA -> a | lambda").unwrap();
        assert_eq!(
            g.to_non_terminal_output_vec().unwrap().to_plaintext(),
            "A | true | a | b\nS | false | a, b | $"
        );
    }

    #[test]
    fn ll1_table_shows_conflicts() {
        let g = Grammar::parse("S -> a | a b").unwrap();
        let table = g.to_ll1_parsing_table_output().unwrap().to_plaintext();
        assert_eq!(table, "  |    a | b | $\nS | 1, 2 |   |  ");
    }

    #[test]
    fn parse_tree_json() {
        let g = Grammar::parse("S -> a S b | lambda").unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();
        let tree = g
            .ll1_parse(&table, &mut TokenStream::parse("a first\nb\n$"))
            .unwrap();
        let json = serde_json::to_string(&tree.to_output(&g).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"symbol":"S","children":[{"symbol":"a","lexeme":"first"},{"symbol":"S","children":[{"symbol":"lambda"}]},{"symbol":"b"}]}"#
        );
        assert_eq!(tree.to_latex(&g), "\\Tree [.{S} {a} [.{S} {$\\epsilon$} ] {b} ]");
    }

    #[test]
    fn dotted_items() {
        let g = Grammar::parse("S -> a S b | lambda").unwrap();
        let fsm = g.to_lr0_fsm();
        let start = fsm.states[fsm.start].to_plaintext(&g);
        assert_eq!(start, "S' -> .S\n---\nS -> .a S b\nS -> lambda .\n===\n- S -> 1\n- a -> 2");
    }
}
