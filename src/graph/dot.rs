use crate::graph::Graph;
use itertools::Itertools;
use std::ffi::OsStr;
use std::fmt::Debug;
use std::io;
use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};

#[derive(Default)]
pub struct DotOptions {
    /// Hide node IDs (including which node is the entrypoint) from the output
    pub omit_node_ids: bool,
    /// Hide branch indices from the output
    pub omit_branch_ids: bool,
    /// Prefix nodes with optional subgraph identifier & return a `subgraph` instead of a `digraph`
    pub subgraph: Option<usize>,
}

impl<T: Debug> Graph<T> {
    /// Converts graph to the [Graphviz DOT Language] for visualisation and debugging.
    ///
    /// See [`DotOptions`] for output format options.
    ///
    /// [Graphviz DOT Language]: https://graphviz.org/doc/info/lang.html
    pub fn as_dot(&self, opts: &DotOptions) -> String {
        const FONT_NAME: &str = "fontname=\"Menlo\"";
        const FONT_SIZE: &str = "fontsize=\"12\"";

        let prefix = &opts.subgraph.map_or(String::new(), |i| format!("s{}_", i));
        let lines = self.iter().flat_map(|node| {
            let label = if opts.omit_node_ids {
                format!("{value:?}", value = node.value)
            } else {
                let entry = match self.entry {
                    Some(id) if id == node.id => "*",
                    _ => "",
                };
                format!("{id}{entry}\\n{value:?}", id = node.id, value = node.value)
            };
            let node_string = format!(
                "  {prefix}{id} [label=\"{label}\",shape=\"box\",{FONT_NAME},{FONT_SIZE}];",
                id = node.id
            );

            let single_successor = node.out_degree() == 1;
            let edge_strings = node
                .successors
                .iter()
                .enumerate()
                .map(move |(branch, target)| {
                    let label = if opts.omit_branch_ids || single_successor {
                        String::new()
                    } else {
                        format!("{branch}")
                    };
                    format!(
                        "  {prefix}{id} -> {prefix}{target} [label=\"{label}\",{FONT_NAME},{FONT_SIZE}];",
                        id = node.id
                    )
                });

            std::iter::once(node_string).chain(edge_strings)
        });
        let lines = lines.format("\n");

        match opts.subgraph {
            Some(i) => format!(
                "subgraph cluster_{i} {{\nlabel = \"{i}\"\n{FONT_NAME}\n{FONT_SIZE}\n{lines}\n}}\n"
            ),
            None => format!("digraph {{\n{lines}\n}}\n"),
        }
    }
}

/// Renders a Graphviz `dot` string to the specified `output` file.
///
/// This requires the `dot` executable to be accessible under the current `PATH`.
pub fn run_graphviz<S: AsRef<OsStr>>(dot: &str, output: S) -> io::Result<ExitStatus> {
    let mut process = Command::new("dot")
        .arg("-Tpng")
        .arg("-o")
        .arg(output)
        .stdin(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = process.stdin.take() {
        stdin.write_all(dot.as_ref())?;
    }

    process.wait()
}

#[cfg(test)]
mod tests {
    use crate::graph::tests::fixture_tree;
    use crate::graph::DotOptions;

    #[test]
    fn as_dot() {
        let (g, (root, a, ..)) = fixture_tree();
        let dot = g.as_dot(&DotOptions::default());
        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.contains(&format!("{root}*")));
        assert!(dot.contains(&format!("{root} -> {a}")));
    }

    #[test]
    fn as_dot_omit_node_ids() {
        let (g, _) = fixture_tree();
        let dot = g.as_dot(&DotOptions {
            omit_node_ids: true,
            ..DotOptions::default()
        });
        assert!(!dot.contains('*'));
        assert!(dot.contains("\"Root\""));
    }

    #[test]
    fn as_dot_subgraph() {
        let (g, (root, a, ..)) = fixture_tree();
        let dot = g.as_dot(&DotOptions {
            subgraph: Some(3),
            ..DotOptions::default()
        });
        assert!(dot.starts_with("subgraph cluster_3 {\n"));
        assert!(dot.contains(&format!("s3_{root} -> s3_{a}")));
    }
}
