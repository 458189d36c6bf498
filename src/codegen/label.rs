//! # Label Code Generation
//!
//! Two halves of label handling, both driven by the rule IR:
//!
//! - *Matching* codegen walks a rule label against the candidate host
//!   item's `label` and emits unification code. Fixed-list matching
//!   pairs atoms in lockstep; variable-list matching peels the anchors
//!   from both ends and assigns the remaining sublist to the label's
//!   single list variable. Every successful bind bumps the generated
//!   `new_assignments` counter so backtracking can undo exactly that
//!   many assignments.
//! - *Evaluation* codegen builds a host label from an RHS label under
//!   the morphism's variable assignments, for relabelling, added items
//!   and condition comparisons.

use super::{CodeBuf, INDENT};
use crate::label::{AtomCategory, RuleAtom, RuleLabel, VarType};

/// How degree operators read their host node inside generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegreeContext {
    /// Inside `apply`: degrees were fetched into `indegree<i>` locals
    /// before any mutation
    Apply,
    /// Inside a predicate evaluator: read through the morphism-bound
    /// `n<i>` node index
    Predicate,
}

/// Escape a string for inclusion in C source.
pub fn c_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Render a rule atom as a C integer expression.
pub fn int_expression(atom: &RuleAtom, ctx: DegreeContext) -> String {
    match atom {
        RuleAtom::Integer(value) => value.to_string(),
        // Atom variables hold an integer-or-string union; arithmetic
        // contexts read the integer arm.
        RuleAtom::Variable {
            name,
            var_type: VarType::Atom,
        } => format!("{name}_var.num"),
        RuleAtom::Variable { name, .. } => format!("{name}_var"),
        RuleAtom::Indegree(node) => match ctx {
            DegreeContext::Apply => format!("indegree{node}"),
            DegreeContext::Predicate => format!("getIndegree(host, n{node})"),
        },
        RuleAtom::Outdegree(node) => match ctx {
            DegreeContext::Apply => format!("outdegree{node}"),
            DegreeContext::Predicate => format!("getOutdegree(host, n{node})"),
        },
        RuleAtom::Length { name, var_type } => match var_type {
            VarType::String | VarType::Character => format!("(int)strlen({name}_var)"),
            _ => format!("getAssignmentLength(morphism, {})", c_quote(name)),
        },
        RuleAtom::Neg(inner) => format!("(-{})", int_expression(inner, ctx)),
        RuleAtom::Add(l, r) => {
            format!("({} + {})", int_expression(l, ctx), int_expression(r, ctx))
        }
        RuleAtom::Subtract(l, r) => {
            format!("({} - {})", int_expression(l, ctx), int_expression(r, ctx))
        }
        RuleAtom::Multiply(l, r) => {
            format!("({} * {})", int_expression(l, ctx), int_expression(r, ctx))
        }
        RuleAtom::Divide(l, r) => {
            format!("({} / {})", int_expression(l, ctx), int_expression(r, ctx))
        }
        RuleAtom::String(_) | RuleAtom::Concat(..) => {
            unreachable!("string expressions are not integer expressions")
        }
    }
}

/// Emit value retrieval for a variable used by rule application.
///
/// Atom and list variables are read through the morphism's assignment
/// table at their point of use, so only integer, character and string
/// variables get a local.
pub fn emit_variable_retrieval(buf: &mut CodeBuf, indent: usize, name: &str, var_type: VarType) {
    match var_type {
        VarType::Integer => buf.line(
            indent,
            &format!("int {name}_var = getIntegerValue({}, morphism);", c_quote(name)),
        ),
        VarType::Character | VarType::String => buf.line(
            indent,
            &format!("string {name}_var = getStringValue({}, morphism);", c_quote(name)),
        ),
        VarType::Atom => emit_atom_variable_union(buf, indent, name),
        VarType::List => {}
    }
}

/// An atom variable's value may be an integer or a string; fetch it
/// into a union local dispatched on the assignment's type.
pub fn emit_atom_variable_union(buf: &mut CodeBuf, indent: usize, name: &str) {
    let quoted = c_quote(name);
    buf.line(
        indent,
        &format!("Assignment *assignment_{name} = lookupVariable(morphism, {quoted});"),
    );
    buf.line(indent, &format!("union {{ int num; string str; }} {name}_var;"));
    buf.line(
        indent,
        &format!(
            "if(assignment_{name}->type == INTEGER_VAR) \
             {name}_var.num = getIntegerValue({quoted}, morphism);"
        ),
    );
    buf.line(
        indent,
        &format!("else {name}_var.str = getStringValue({quoted}, morphism);"),
    );
}

// ============================================================================
// Matching
// ============================================================================

/// Emit fixed-list matching: the rule label has no list variable, so
/// the host list must have exactly the rule label's length and every
/// atom pair must unify. Sets the generated `match` flag on success.
pub fn generate_fixed_list_matching(label: &RuleLabel, indent: usize, buf: &mut CodeBuf) {
    buf.line(indent, "int new_assignments = 0;");
    if label.atoms.is_empty() {
        buf.line(indent, "if(label.length == 0) match = true;");
        return;
    }
    buf.line(indent, "do");
    buf.line(indent, "{");
    let inner = indent + INDENT;
    buf.line(inner, &format!("if(label.length != {}) break;", label.len()));
    buf.line(inner, "HostListItem *item = label.list->first;");
    if label.atoms.iter().any(atom_binds) {
        buf.line(inner, "int result = -1;");
    }
    let mut temps = 0;
    for (position, atom) in label.atoms.iter().enumerate() {
        emit_atom_match(atom, "item", inner, buf, &mut temps);
        if position + 1 < label.len() {
            buf.line(inner, "item = item->next;");
        }
    }
    buf.line(inner, "match = true;");
    buf.line(indent, "} while(false);");
}

/// Emit variable-list matching: anchors before the list variable are
/// matched from the front of the host list, anchors after it from the
/// back, and the remaining span is assigned to the list variable.
pub fn generate_variable_list_matching(label: &RuleLabel, indent: usize, buf: &mut CodeBuf) {
    let position = label
        .list_variable_position()
        .expect("caller checked for a list variable");
    let list_name = match &label.atoms[position] {
        RuleAtom::Variable { name, .. } => name.clone(),
        _ => unreachable!("list variable position points at a variable"),
    };
    buf.line(indent, "int new_assignments = 0;");
    buf.line(indent, "do");
    buf.line(indent, "{");
    let inner = indent + INDENT;
    if label.len() > 1 {
        buf.line(
            inner,
            &format!("if(label.length < {}) break;", label.len() - 1),
        );
    }
    buf.line(inner, "int result = -1;");
    buf.line(inner, "HostListItem *item = label.list->first;");
    let mut temps = 0;
    for atom in &label.atoms[..position] {
        emit_atom_match(atom, "item", inner, buf, &mut temps);
        buf.line(inner, "item = item->next;");
    }
    buf.line(inner, "HostListItem *end = label.list->last;");
    for atom in label.atoms[position + 1..].iter().rev() {
        emit_atom_match(atom, "end", inner, buf, &mut temps);
        buf.line(inner, "end = end->prev;");
    }
    buf.line(
        inner,
        "/* Assign the remaining sublist to the list variable. */",
    );
    buf.line(
        inner,
        &format!(
            "result = addListAssignment(morphism, {}, item, end);",
            c_quote(&list_name)
        ),
    );
    buf.line(inner, "if(result == -1) break;");
    buf.line(inner, "new_assignments += result;");
    buf.line(inner, "match = true;");
    buf.line(indent, "} while(false);");
}

/// True if matching this atom may add variable assignments.
fn atom_binds(atom: &RuleAtom) -> bool {
    match atom {
        RuleAtom::Variable { .. } => true,
        RuleAtom::Concat(left, right) => atom_binds(left) || atom_binds(right),
        _ => false,
    }
}

/// Emit the match of one rule atom against `<item>->atom`.
fn emit_atom_match(
    atom: &RuleAtom,
    item: &str,
    indent: usize,
    buf: &mut CodeBuf,
    temps: &mut usize,
) {
    match atom {
        RuleAtom::Integer(value) => buf.line(
            indent,
            &format!("if({item}->atom.type != 'i' || {item}->atom.num != {value}) break;"),
        ),
        RuleAtom::String(text) => buf.line(
            indent,
            &format!(
                "if({item}->atom.type != 's' || strcmp({item}->atom.str, {}) != 0) break;",
                c_quote(text)
            ),
        ),
        RuleAtom::Variable { name, var_type } => match var_type {
            VarType::Integer => {
                buf.line(indent, &format!("if({item}->atom.type != 'i') break;"));
                emit_bind(
                    buf,
                    indent,
                    &format!(
                        "addIntegerAssignment(morphism, {}, {item}->atom.num)",
                        c_quote(name)
                    ),
                );
            }
            VarType::Character => {
                buf.line(
                    indent,
                    &format!(
                        "if({item}->atom.type != 's' || strlen({item}->atom.str) != 1) break;"
                    ),
                );
                emit_bind(
                    buf,
                    indent,
                    &format!(
                        "addStringAssignment(morphism, {}, {item}->atom.str)",
                        c_quote(name)
                    ),
                );
            }
            VarType::String => {
                buf.line(indent, &format!("if({item}->atom.type != 's') break;"));
                emit_bind(
                    buf,
                    indent,
                    &format!(
                        "addStringAssignment(morphism, {}, {item}->atom.str)",
                        c_quote(name)
                    ),
                );
            }
            VarType::Atom => {
                emit_bind(
                    buf,
                    indent,
                    &format!(
                        "addAtomAssignment(morphism, {}, {item}->atom)",
                        c_quote(name)
                    ),
                );
            }
            VarType::List => unreachable!("list variables are handled by the span assignment"),
        },
        RuleAtom::Concat(..) => emit_string_match(atom, item, indent, buf, temps),
        _ => unreachable!("left-hand-side labels contain no arithmetic"),
    }
}

fn emit_bind(buf: &mut CodeBuf, indent: usize, call: &str) {
    buf.line(indent, &format!("result = {call};"));
    buf.line(indent, "if(result == -1) break;");
    buf.line(indent, "new_assignments += result;");
}

/// Concatenated string matching by prefix/suffix peeling. Constants and
/// character variables before the string variable consume from the
/// front, those after it from the back; the string variable takes the
/// remainder. Without a string variable the whole host string must be
/// consumed.
fn emit_string_match(
    atom: &RuleAtom,
    item: &str,
    indent: usize,
    buf: &mut CodeBuf,
    temps: &mut usize,
) {
    let mut elements = Vec::new();
    flatten_concat(atom, &mut elements);
    let string_var = elements.iter().position(|e| {
        matches!(
            e,
            RuleAtom::Variable {
                var_type: VarType::String,
                ..
            }
        )
    });

    let id = *temps;
    *temps += 1;
    let host = format!("host_string{id}");
    let start = format!("start{id}");
    let end = format!("end{id}");

    buf.line(indent, &format!("if({item}->atom.type != 's') break;"));
    buf.line(indent, &format!("string {host} = {item}->atom.str;"));
    buf.line(indent, &format!("unsigned int {start} = 0;"));
    buf.line(indent, &format!("unsigned int {end} = strlen({host});"));

    let front_count = string_var.unwrap_or(elements.len());
    for element in &elements[..front_count] {
        emit_string_element(element, true, &host, &start, &end, indent, buf, temps);
    }
    if let Some(var_position) = string_var {
        for element in elements[var_position + 1..].iter().rev() {
            emit_string_element(element, false, &host, &start, &end, indent, buf, temps);
        }
        let name = match elements[var_position] {
            RuleAtom::Variable { ref name, .. } => name.clone(),
            _ => unreachable!(),
        };
        let sub = format!("substring{id}");
        buf.line(indent, &format!("char {sub}[{end} - {start} + 1];"));
        buf.line(
            indent,
            &format!("strncpy({sub}, {host} + {start}, {end} - {start});"),
        );
        buf.line(indent, &format!("{sub}[{end} - {start}] = '\\0';"));
        emit_bind(
            buf,
            indent,
            &format!("addStringAssignment(morphism, {}, {sub})", c_quote(&name)),
        );
    } else {
        buf.line(indent, &format!("if({start} != {end}) break;"));
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_string_element(
    element: &RuleAtom,
    from_front: bool,
    host: &str,
    start: &str,
    end: &str,
    indent: usize,
    buf: &mut CodeBuf,
    temps: &mut usize,
) {
    match element {
        RuleAtom::String(text) => {
            let length = text.chars().count();
            let quoted = c_quote(text);
            if from_front {
                buf.line(
                    indent,
                    &format!(
                        "if({end} - {start} < {length} || \
                         strncmp({host} + {start}, {quoted}, {length}) != 0) break;"
                    ),
                );
                buf.line(indent, &format!("{start} += {length};"));
            } else {
                buf.line(
                    indent,
                    &format!(
                        "if({end} - {start} < {length} || \
                         strncmp({host} + {end} - {length}, {quoted}, {length}) != 0) break;"
                    ),
                );
                buf.line(indent, &format!("{end} -= {length};"));
            }
        }
        RuleAtom::Variable { name, .. } => {
            // A character variable binds one character from this end.
            let id = *temps;
            *temps += 1;
            let char_buf = format!("char_buf{id}");
            buf.line(indent, &format!("if({end} - {start} < 1) break;"));
            if from_front {
                buf.line(
                    indent,
                    &format!("char {char_buf}[2] = {{{host}[{start}], '\\0'}};"),
                );
            } else {
                buf.line(
                    indent,
                    &format!("char {char_buf}[2] = {{{host}[{end} - 1], '\\0'}};"),
                );
            }
            emit_bind(
                buf,
                indent,
                &format!(
                    "addStringAssignment(morphism, {}, {char_buf})",
                    c_quote(name)
                ),
            );
            if from_front {
                buf.line(indent, &format!("{start} += 1;"));
            } else {
                buf.line(indent, &format!("{end} -= 1;"));
            }
        }
        _ => unreachable!("concatenations contain only string constants and variables"),
    }
}

fn flatten_concat<'a>(atom: &'a RuleAtom, out: &mut Vec<&'a RuleAtom>) {
    match atom {
        RuleAtom::Concat(left, right) => {
            flatten_concat(left, out);
            flatten_concat(right, out);
        }
        other => out.push(other),
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Emit evaluation of a rule label into the host-label variable
/// `target`. `count` makes the generated temporaries unique within the
/// surrounding procedure. Callers shortcut blank labels to the
/// runtime's `blank_label` themselves.
pub fn generate_label_evaluation(
    label: &RuleLabel,
    target: &str,
    count: usize,
    ctx: DegreeContext,
    indent: usize,
    buf: &mut CodeBuf,
) {
    let mark = label.mark.code();
    if label.atoms.is_empty() {
        buf.line(
            indent,
            &format!("{target} = makeHostLabel({mark}, 0, NULL);"),
        );
        return;
    }

    let fixed_count = label
        .atoms
        .iter()
        .filter(|a| !a.is_list_variable())
        .count();
    let length = format!("list_length{count}");
    if label.has_list_variable() {
        let name = list_variable_name(label);
        buf.line(
            indent,
            &format!(
                "int {length} = {fixed_count} + getAssignmentLength(morphism, {});",
                c_quote(&name)
            ),
        );
    } else {
        buf.line(indent, &format!("int {length} = {fixed_count};"));
    }
    let array = format!("array{count}");
    let index = format!("index{count}");
    // Padded by one so an empty list variable cannot produce a
    // zero-length array.
    buf.line(indent, &format!("HostAtom {array}[{length} + 1];"));
    buf.line(indent, &format!("int {index} = 0;"));

    let mut temps = 0;
    for atom in &label.atoms {
        match atom.category() {
            AtomCategory::Integer => {
                buf.line(indent, &format!("{array}[{index}].type = 'i';"));
                buf.line(
                    indent,
                    &format!("{array}[{index}++].num = {};", int_expression(atom, ctx)),
                );
            }
            AtomCategory::ListShaped => {
                let name = match atom {
                    RuleAtom::Variable { name, .. } => name,
                    _ => unreachable!(),
                };
                buf.line(
                    indent,
                    &format!(
                        "{index} = appendAssignment(morphism, {}, {array}, {index});",
                        c_quote(name)
                    ),
                );
            }
            AtomCategory::String => match atom {
                RuleAtom::String(text) => {
                    buf.line(indent, &format!("{array}[{index}].type = 's';"));
                    buf.line(
                        indent,
                        &format!("{array}[{index}++].str = {};", c_quote(text)),
                    );
                }
                RuleAtom::Variable {
                    name,
                    var_type: VarType::Atom,
                } => {
                    buf.line(
                        indent,
                        &format!(
                            "{array}[{index}++] = getAssignmentAtom(morphism, {});",
                            c_quote(name)
                        ),
                    );
                }
                RuleAtom::Variable { name, .. } => {
                    buf.line(indent, &format!("{array}[{index}].type = 's';"));
                    buf.line(indent, &format!("{array}[{index}++].str = {name}_var;"));
                }
                RuleAtom::Concat(..) => {
                    let string = emit_string_build(atom, count, &mut temps, indent, buf);
                    buf.line(indent, &format!("{array}[{index}].type = 's';"));
                    buf.line(indent, &format!("{array}[{index}++].str = {string};"));
                }
                _ => unreachable!("string-categorised atom"),
            },
        }
    }
    buf.line(
        indent,
        &format!(
            "{target} = makeHostLabel({mark}, {length}, makeHostList({array}, {length}, true));"
        ),
    );
}

fn list_variable_name(label: &RuleLabel) -> String {
    label
        .atoms
        .iter()
        .find_map(|atom| match atom {
            RuleAtom::Variable { name, var_type } if *var_type == VarType::List => {
                Some(name.clone())
            }
            _ => None,
        })
        .expect("label has a list variable")
}

/// Build a concatenated string into a stack buffer; returns the buffer
/// name. `makeHostList` copies, so stack storage is fine.
fn emit_string_build(
    atom: &RuleAtom,
    count: usize,
    temps: &mut usize,
    indent: usize,
    buf: &mut CodeBuf,
) -> String {
    let mut elements = Vec::new();
    flatten_concat(atom, &mut elements);

    let id = *temps;
    *temps += 1;
    let name = if id == 0 {
        format!("string{count}")
    } else {
        format!("string{count}_{id}")
    };
    let length = if id == 0 {
        format!("length{count}")
    } else {
        format!("length{count}_{id}")
    };

    let mut constant_length = 0;
    let mut variable_terms = Vec::new();
    for element in &elements {
        match element {
            RuleAtom::String(text) => constant_length += text.chars().count(),
            RuleAtom::Variable { name, .. } => variable_terms.push(format!("strlen({name}_var)")),
            _ => unreachable!("concatenations contain only string constants and variables"),
        }
    }
    let mut length_expr = constant_length.to_string();
    for term in &variable_terms {
        length_expr.push_str(" + ");
        length_expr.push_str(term);
    }
    buf.line(indent, &format!("unsigned int {length} = {length_expr};"));
    buf.line(indent, &format!("char {name}[{length} + 1];"));
    buf.line(indent, &format!("{name}[0] = '\\0';"));
    for element in &elements {
        match element {
            RuleAtom::String(text) => {
                buf.line(indent, &format!("strcat({name}, {});", c_quote(text)));
            }
            RuleAtom::Variable { name: var, .. } => {
                buf.line(indent, &format!("strcat({name}, {var}_var);"));
            }
            _ => unreachable!(),
        }
    }
    name
}
