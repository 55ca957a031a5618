//! What each instruction does when it runs.

use std::rc::Rc;

use dsssl_foundation::{Location, SymbolId};

use crate::diagnostic::Diagnostic;
use crate::flow::{FlowObject, Sosofo, Style};
use crate::function::{Closure, Function};
use crate::insn::{Insn, InsnPtr};
use crate::value::{BoxObj, Value};

use super::Vm;
use super::call::Linkage;

impl Insn {
    /// Runs this instruction and returns the next one; `None` halts.
    #[allow(clippy::too_many_lines)]
    pub fn execute(&self, vm: &mut Vm<'_>) -> InsnPtr {
        match self {
            Self::Error => vm.abort(),
            Self::CondFail { location } => vm.fail(*location, Diagnostic::CondFail),
            Self::CaseFail { location } => {
                let key = vm.interp.print(vm.top());
                vm.fail(*location, Diagnostic::CaseFail(key))
            }
            Self::Constant { value, next } => {
                vm.need_stack(1);
                vm.push(value.clone());
                next.clone()
            }
            Self::ResolveQuantities { location, next } => {
                let top = vm.top().clone();
                match vm.interp.resolve_quantities(&top, true, *location) {
                    Some(resolved) if !resolved.is_error() => {
                        vm.set_top(resolved);
                        next.clone()
                    }
                    _ => vm.abort(),
                }
            }
            Self::Test {
                consequent,
                alternative,
            } => {
                if vm.pop().is_true() {
                    consequent.clone()
                } else {
                    alternative.clone()
                }
            }
            Self::Or { next_test, next } => {
                if vm.top().is_true() {
                    return next.clone();
                }
                vm.pop();
                next_test.clone()
            }
            Self::And { next_test, next } => {
                if !vm.top().is_true() {
                    return next.clone();
                }
                vm.pop();
                next_test.clone()
            }
            Self::Case {
                datum,
                on_match,
                fail,
            } => {
                if vm.top().eqv(datum) {
                    vm.pop();
                    on_match.clone()
                } else {
                    fail.clone()
                }
            }
            Self::Pop { next } => {
                vm.pop();
                next.clone()
            }
            Self::Cons { next } => {
                let car = vm.pop();
                let cdr = vm.pop();
                vm.push(Value::cons(car, cdr));
                next.clone()
            }
            Self::Append { location, next } => {
                let source = vm.pop();
                if source.is_nil() {
                    return next.clone();
                }
                let Some(items) = source.list_to_vec() else {
                    return vm.fail(*location, Diagnostic::SpliceNotList);
                };
                let tail = vm.pop();
                vm.push(Value::list_with_tail(items, tail));
                next.clone()
            }
            Self::Vector { n, next } => {
                let base = vm.stack.len() - n;
                let elements = vm.stack.split_off(base);
                vm.need_stack(1);
                vm.push(Value::vector(elements));
                next.clone()
            }
            Self::ListToVector { next } => {
                let elements = vm.top().list_to_vec().unwrap_or_default();
                vm.set_top(Value::vector(elements));
                next.clone()
            }
            Self::Apply {
                n_args,
                location,
                next,
            } => vm.apply_top(*n_args, *location, Linkage::Call(next)),
            Self::TailApply {
                n_caller_args,
                n_args,
                location,
            } => vm.apply_top(*n_args, *location, Linkage::TailCall(*n_caller_args)),
            Self::FrameRef { index, next } => {
                vm.need_stack(1);
                let value = vm.stack[vm.frame + index].clone();
                vm.push(value);
                next.clone()
            }
            Self::StackRef { offset, next } => {
                vm.need_stack(1);
                let value = vm.stack[vm.slot(*offset)].clone();
                vm.push(value);
                next.clone()
            }
            Self::ClosureRef { index, next } => {
                vm.need_stack(1);
                let value = vm.closure[*index].clone();
                vm.push(value);
                next.clone()
            }
            Self::TopRef { name, next } => match vm.interp.compute_value(*name, true) {
                Some(value) if !value.is_error() => {
                    vm.need_stack(1);
                    vm.push(value);
                    next.clone()
                }
                _ => vm.abort(),
            },
            Self::ClosureSetBox {
                index,
                location,
                next,
            } => {
                let target = vm.closure[*index].clone();
                set_box(vm, &target, *location, next)
            }
            Self::StackSetBox {
                offset,
                location,
                next,
            } => {
                let target = vm.stack[vm.slot(*offset)].clone();
                set_box(vm, &target, *location, next)
            }
            Self::StackSet { offset, next } => {
                let index = vm.slot(*offset);
                let value = vm.top().clone();
                let old = std::mem::replace(&mut vm.stack[index], value);
                vm.set_top(old);
                next.clone()
            }
            Self::PopBindings { n, next } => {
                let result = vm.pop();
                let len = vm.stack.len();
                vm.stack.truncate(len - n);
                vm.push(result);
                next.clone()
            }
            Self::Return { total_args } => {
                let result = vm.pop();
                let len = vm.stack.len();
                vm.stack.truncate(len - total_args);
                let next = vm.pop_frame();
                vm.push(result);
                next
            }
            Self::SetBox { n, next } => {
                let value = vm.pop();
                let index = vm.stack.len() - n;
                if let Value::Box(b) = &vm.stack[index] {
                    b.replace(value);
                }
                next.clone()
            }
            Self::SetImmediate { n, next } => {
                let value = vm.pop();
                let index = vm.stack.len() - n;
                vm.stack[index] = value;
                next.clone()
            }
            Self::CheckInit {
                name,
                location,
                next,
            } => {
                if matches!(vm.top(), Value::Uninit) {
                    let name = vm.interp.name(*name).to_string();
                    return vm.fail(*location, Diagnostic::UninitializedVariableReference(name));
                }
                next.clone()
            }
            Self::Unbox { next } => {
                if let Value::Box(b) = vm.top() {
                    let contents = b.get();
                    vm.set_top(contents);
                }
                next.clone()
            }
            Self::Box { next } => {
                let value = vm.pop();
                vm.push(Value::Box(Rc::new(BoxObj::new(value))));
                next.clone()
            }
            Self::BoxArg { index, next } => {
                let index = vm.frame + index;
                box_slot(vm, index);
                next.clone()
            }
            Self::BoxStack { offset, next } => {
                let index = vm.slot(*offset);
                box_slot(vm, index);
                next.clone()
            }
            Self::TestNull {
                offset,
                if_null,
                if_not_null,
            } => {
                if matches!(vm.stack[vm.slot(*offset)], Value::Uninit) {
                    if_null.clone()
                } else {
                    if_not_null.clone()
                }
            }
            Self::SetKeyArg { offset, next } => {
                let value = vm.pop();
                let index = vm.slot(*offset);
                vm.stack[index] = value;
                next.clone()
            }
            Self::Varargs {
                signature,
                entry_points,
                location,
            } => vm.enter_varargs(signature, entry_points, *location),
            Self::PrimitiveCall {
                n_args,
                function,
                location,
                next,
            }
            | Self::FunctionCall {
                n_args,
                function,
                location,
                next,
            } => {
                vm.n_actual_args = *n_args;
                vm.call(function, *location, Linkage::Call(next))
            }
            Self::FunctionTailCall {
                n_args,
                function,
                location,
                n_caller_args,
            } => {
                vm.n_actual_args = *n_args;
                vm.call(function, *location, Linkage::TailCall(*n_caller_args))
            }
            Self::Closure {
                signature,
                code,
                display_length,
                next,
            } => {
                let base = vm.stack.len() - display_length;
                let display: Rc<[Value]> = Rc::from(vm.stack.split_off(base));
                let closure = Closure::new(Rc::clone(signature), code.clone(), display);
                vm.need_stack(1);
                vm.push(Value::Function(Rc::new(Function::Closure(closure))));
                next.clone()
            }
            Self::PushMode { mode, next } => {
                vm.push_mode(*mode);
                next.clone()
            }
            Self::PopMode { next } => {
                vm.pop_mode();
                next.clone()
            }
            Self::CheckStyle { location, next } => {
                if matches!(vm.top(), Value::Style(_)) {
                    next.clone()
                } else {
                    vm.fail(*location, Diagnostic::StyleContext)
                }
            }
            Self::CheckSosofo { location, next } => {
                if matches!(vm.top(), Value::Sosofo(_)) {
                    next.clone()
                } else {
                    vm.fail(*location, Diagnostic::SosofoContext)
                }
            }
            Self::MakeStyle {
                keys,
                has_use,
                next,
            } => {
                let parent = has_use.then(|| vm.pop()).and_then(as_style);
                let characteristics = pop_characteristics(vm, keys);
                vm.push(Value::Style(Rc::new(Style {
                    characteristics,
                    parent,
                })));
                next.clone()
            }
            Self::MakeFlowObject {
                class,
                keys,
                has_use,
                n_content,
                next,
            } => {
                let base = vm.stack.len() - n_content;
                let content = vm
                    .stack
                    .split_off(base)
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Sosofo(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                let style = has_use.then(|| vm.pop()).and_then(as_style);
                let characteristics = pop_characteristics(vm, keys);
                let flow_object = FlowObject {
                    class: *class,
                    characteristics,
                    style,
                    mode: vm.mode,
                    content,
                };
                vm.push(Value::Sosofo(Rc::new(Sosofo::FlowObject(flow_object))));
                next.clone()
            }
        }
    }
}

fn set_box(vm: &mut Vm<'_>, target: &Value, location: Location, next: &InsnPtr) -> InsnPtr {
    let Value::Box(b) = target else {
        return vm.abort();
    };
    if b.is_read_only() {
        return vm.fail(location, Diagnostic::ReadOnly);
    }
    let old = b.replace(vm.top().clone());
    vm.set_top(old);
    next.clone()
}

fn box_slot(vm: &mut Vm<'_>, index: usize) {
    let value = std::mem::take(&mut vm.stack[index]);
    vm.stack[index] = Value::Box(Rc::new(BoxObj::new(value)));
}

fn as_style(value: Value) -> Option<Rc<Style>> {
    match value {
        Value::Style(s) => Some(s),
        _ => None,
    }
}

fn pop_characteristics(vm: &mut Vm<'_>, keys: &[SymbolId]) -> Vec<(SymbolId, Value)> {
    let base = vm.stack.len() - keys.len();
    keys.iter().copied().zip(vm.stack.split_off(base)).collect()
}
