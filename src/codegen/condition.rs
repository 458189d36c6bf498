//! # Condition Code Generation
//!
//! The condition machinery is emitted in three passes: one runtime
//! boolean per predicate, the `evaluateCondition` procedure mapping the
//! condition tree onto those booleans, and one evaluator procedure per
//! predicate.
//!
//! A boolean's initial value is chosen so the whole condition holds
//! before any predicate has run: true under an even number of `not`
//! ancestors, false under an odd number. Evaluators bail out without
//! touching their boolean while any referenced node or variable is
//! still unbound, so partially-matched morphisms can never falsify the
//! condition spuriously.

use super::label::{
    c_quote, generate_label_evaluation, int_expression, DegreeContext,
};
use super::{CodeBuf, RuleModule, INDENT};
use crate::label::VarType;
use crate::rule::{Condition, Predicate, PredicateKind, Rule};

/// Emit the file-scope boolean for each predicate, neutrally
/// initialised by `not` parity.
pub fn generate_condition_variables(rule: &Rule, module: &mut RuleModule) {
    for predicate in &rule.predicates {
        let initial = if predicate.negated { "false" } else { "true" };
        module
            .statics
            .push(format!("bool b{} = {};", predicate.bool_id, initial));
    }
}

/// Emit `evaluateCondition`: the condition tree as one boolean
/// expression over the predicate booleans.
pub fn generate_condition_evaluator(rule: &Rule, module: &mut RuleModule) {
    let condition = rule.condition.as_ref().expect("rule has a condition");
    let mut body = CodeBuf::new();
    body.line(
        INDENT,
        &format!("return ({});", condition_expression(condition, false)),
    );
    module.add_procedure("evaluateCondition", true, "bool", "void", body);
}

fn condition_expression(condition: &Condition, nested: bool) -> String {
    match condition {
        Condition::Predicate(id) => format!("b{id}"),
        Condition::Not(inner) => match inner.as_ref() {
            Condition::Predicate(id) => format!("!b{id}"),
            other => format!("!({})", condition_expression(other, false)),
        },
        Condition::And(left, right) => {
            let text = format!(
                "{} && {}",
                condition_expression(left, true),
                condition_expression(right, true)
            );
            if nested {
                format!("({text})")
            } else {
                text
            }
        }
        Condition::Or(left, right) => {
            let text = format!(
                "{} || {}",
                condition_expression(left, true),
                condition_expression(right, true)
            );
            if nested {
                format!("({text})")
            } else {
                text
            }
        }
    }
}

/// Emit one evaluator procedure per predicate, in `bool_id` order.
pub fn generate_predicate_evaluators(rule: &Rule, module: &mut RuleModule) {
    for predicate in &rule.predicates {
        generate_predicate_code(rule, predicate, module);
    }
}

/// One predicate evaluator: fetch the nodes and variables the predicate
/// depends on, returning untouched if any is still unbound, then store
/// the predicate's result in its boolean.
fn generate_predicate_code(rule: &Rule, predicate: &Predicate, module: &mut RuleModule) {
    let mut buf = CodeBuf::new();
    let i1 = INDENT;
    let id = predicate.bool_id;

    if let Some(lhs) = &rule.lhs {
        for node in &lhs.nodes {
            if node.predicates.contains(&id) {
                buf.line(
                    i1,
                    &format!("int n{} = lookupNode(morphism, {});", node.index, node.index),
                );
                buf.line(
                    i1,
                    "/* If the node is not yet matched by the morphism, return. */",
                );
                buf.line(i1, &format!("if(n{} == -1) return;", node.index));
                buf.blank();
            }
        }
    }
    for variable in &rule.variables {
        if variable.predicates.contains(&id) {
            let name = &variable.name;
            buf.line(
                i1,
                &format!(
                    "Assignment *assignment_{name} = lookupVariable(morphism, {});",
                    c_quote(name)
                ),
            );
            buf.line(i1, "/* If the variable is not yet assigned, return. */");
            buf.line(i1, &format!("if(assignment_{name} == NULL) return;"));
            match variable.var_type {
                VarType::Integer => {
                    buf.line(
                        i1,
                        &format!(
                            "int {name}_var = getIntegerValue({}, morphism);",
                            c_quote(name)
                        ),
                    );
                }
                VarType::Character | VarType::String => {
                    buf.line(
                        i1,
                        &format!(
                            "string {name}_var = getStringValue({}, morphism);",
                            c_quote(name)
                        ),
                    );
                }
                VarType::Atom => {
                    let quoted = c_quote(name);
                    buf.line(i1, &format!("union {{ int num; string str; }} {name}_var;"));
                    buf.line(
                        i1,
                        &format!(
                            "if(assignment_{name}->type == INTEGER_VAR) \
                             {name}_var.num = getIntegerValue({quoted}, morphism);"
                        ),
                    );
                    buf.line(
                        i1,
                        &format!("else {name}_var.str = getStringValue({quoted}, morphism);"),
                    );
                }
                // List variables are read through the assignment at
                // their point of use.
                VarType::List => {}
            }
            buf.blank();
        }
    }

    match &predicate.kind {
        PredicateKind::IntCheck { var } => {
            buf.line(
                i1,
                &format!("if(assignment_{var}->type == INTEGER_VAR) b{id} = true;"),
            );
            buf.line(i1, &format!("else b{id} = false;"));
        }
        PredicateKind::CharCheck { var } => {
            buf.line(i1, &format!("if(assignment_{var}->type == STRING_VAR &&"));
            buf.line(
                i1 + INDENT,
                &format!("strlen(assignment_{var}->value[0].string) == 1)"),
            );
            buf.line(i1 + INDENT, &format!("b{id} = true;"));
            buf.line(i1, &format!("else b{id} = false;"));
        }
        PredicateKind::StringCheck { var } => {
            buf.line(
                i1,
                &format!("if(assignment_{var}->type == STRING_VAR) b{id} = true;"),
            );
            buf.line(i1, &format!("else b{id} = false;"));
        }
        PredicateKind::AtomCheck { var } => {
            buf.line(
                i1,
                &format!("if(assignment_{var}->type != LIST_VAR) b{id} = true;"),
            );
            buf.line(i1, &format!("else b{id} = false;"));
        }
        PredicateKind::Edge {
            source,
            target,
            label,
        } => {
            let i2 = 2 * INDENT;
            let i3 = 3 * INDENT;
            buf.line(i1, &format!("Node *source = getNode(host, n{source});"));
            buf.line(i1, "bool edge_found = false;");
            buf.line(i1, "int counter;");
            buf.line(
                i1,
                "for(counter = 0; counter < source->out_edges.size + 2; counter++)",
            );
            buf.line(i1, "{");
            buf.line(i2, "Edge *edge = getNthOutEdge(host, source, counter);");
            buf.line(
                i2,
                &format!("if(edge != NULL && edge->target == n{target})"),
            );
            buf.line(i2, "{");
            match label {
                Some(rule_label) => {
                    buf.line(i3, "HostLabel label;");
                    generate_label_evaluation(
                        rule_label,
                        "label",
                        0,
                        DegreeContext::Predicate,
                        i3,
                        &mut buf,
                    );
                    buf.line(i3, "if(equalLabels(label, edge->label))");
                    buf.line(i3, "{");
                    buf.line(3 * INDENT + INDENT, &format!("b{id} = true;"));
                    buf.line(3 * INDENT + INDENT, "edge_found = true;");
                    buf.line(i3, "}");
                    // Release the evaluated label on both outcomes.
                    buf.line(i3, "removeHostList(label.list);");
                    buf.line(i3, "if(edge_found) break;");
                }
                None => {
                    buf.line(i3, &format!("b{id} = true;"));
                    buf.line(i3, "edge_found = true;");
                    buf.line(i3, "break;");
                }
            }
            buf.line(i2, "}");
            buf.line(i1, "}");
            buf.line(i1, &format!("if(!edge_found) b{id} = false;"));
        }
        PredicateKind::Equal { left, right } | PredicateKind::NotEqual { left, right } => {
            let negate = matches!(predicate.kind, PredicateKind::NotEqual { .. });
            // Integer-shaped operands compare as plain integers;
            // anything else is built into host lists and compared
            // structurally.
            if left.is_integer_shaped() && right.is_integer_shaped() {
                let operator = if negate { "!=" } else { "==" };
                buf.line(
                    i1,
                    &format!(
                        "if({} {} {}) b{id} = true;",
                        int_expression(&left.atoms[0], DegreeContext::Predicate),
                        operator,
                        int_expression(&right.atoms[0], DegreeContext::Predicate)
                    ),
                );
                buf.line(i1, &format!("else b{id} = false;"));
            } else {
                buf.line(i1, "HostLabel left_label, right_label;");
                generate_label_evaluation(
                    left,
                    "left_label",
                    0,
                    DegreeContext::Predicate,
                    i1,
                    &mut buf,
                );
                generate_label_evaluation(
                    right,
                    "right_label",
                    1,
                    DegreeContext::Predicate,
                    i1,
                    &mut buf,
                );
                let bang = if negate { "!" } else { "" };
                buf.line(
                    i1,
                    &format!("if({bang}equalLabels(left_label, right_label)) b{id} = true;"),
                );
                buf.line(i1, &format!("else b{id} = false;"));
                // Release both evaluated labels on both outcomes.
                buf.line(i1, "removeHostList(left_label.list);");
                buf.line(i1, "removeHostList(right_label.list);");
            }
        }
        PredicateKind::Greater { left, right }
        | PredicateKind::GreaterEqual { left, right }
        | PredicateKind::Less { left, right }
        | PredicateKind::LessEqual { left, right } => {
            let operator = match predicate.kind {
                PredicateKind::Greater { .. } => ">",
                PredicateKind::GreaterEqual { .. } => ">=",
                PredicateKind::Less { .. } => "<",
                _ => "<=",
            };
            buf.line(
                i1,
                &format!(
                    "if({} {} {}) b{id} = true;",
                    int_expression(left, DegreeContext::Predicate),
                    operator,
                    int_expression(right, DegreeContext::Predicate)
                ),
            );
            buf.line(i1, &format!("else b{id} = false;"));
        }
    }
    module.add_procedure(
        format!("evaluatePredicate{id}"),
        true,
        "void",
        "Morphism *morphism",
        buf,
    );
}
