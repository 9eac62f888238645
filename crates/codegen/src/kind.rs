//! Node kinds of the Pascal program grammar.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Program,
    Header,
    DescriptionSection,
    DeclarationList,
    Declaration,
    VariableType,
    VariableList,
    VariableListTail,
    OperatorSection,
    OperatorList,
    OperatorListTail,
    Operator,
    Assignment,
    Conditional,
    Input,
    Output,
    Expression,
    ExpressionTail,
    Comparison,
    ComparisonOperator,
    Sum,
    SumTail,
    Term,
    TermTail,
    Factor,
    /// Any node the generator has no rule for.
    Other(String),
}

impl NodeKind {
    pub fn of(name: &str) -> NodeKind {
        match name {
            "program file" => NodeKind::Program,
            "header" => NodeKind::Header,
            "description section" => NodeKind::DescriptionSection,
            "declaration list" => NodeKind::DeclarationList,
            "declaration" => NodeKind::Declaration,
            "variable type" => NodeKind::VariableType,
            "variable list" => NodeKind::VariableList,
            "variable list tail" => NodeKind::VariableListTail,
            "operator section" => NodeKind::OperatorSection,
            "operator list" => NodeKind::OperatorList,
            "operator list tail" => NodeKind::OperatorListTail,
            "operator" => NodeKind::Operator,
            "assignment" => NodeKind::Assignment,
            "conditional" => NodeKind::Conditional,
            "input" => NodeKind::Input,
            "output" => NodeKind::Output,
            "expression" => NodeKind::Expression,
            "expression tail" => NodeKind::ExpressionTail,
            "comparison" => NodeKind::Comparison,
            "comparison operator" => NodeKind::ComparisonOperator,
            "sum" => NodeKind::Sum,
            "sum tail" => NodeKind::SumTail,
            "term" => NodeKind::Term,
            "term tail" => NodeKind::TermTail,
            "factor" => NodeKind::Factor,
            other => NodeKind::Other(other.to_owned()),
        }
    }
}
