//! Single-line signature rendering for rustdoc types.
//!
//! Output is deterministic and never contains a newline: where clauses are
//! always written inline.

use crate::raw::RawTree;
use rustdoc_types::{
    Abi, AssocItemConstraint, AssocItemConstraintKind, Function, FunctionHeader, GenericArg,
    GenericArgs, GenericBound, GenericParamDef, GenericParamDefKind, Generics, Impl, Path,
    PreciseCapturingArg, Term, Trait, TraitBoundModifier, Type, WherePredicate,
};
use std::fmt::{self, Write};

/// Renders rustdoc types against a crate's path table.
///
/// `write_*` methods write to any buffer; `*_signature` helpers return owned strings.
pub struct TypeFormatter<'a> {
    tree: &'a RawTree,
}

impl<'a> TypeFormatter<'a> {
    pub const fn new(tree: &'a RawTree) -> Self {
        Self { tree }
    }

    pub fn type_to_string(&self, ty: &Type) -> String {
        let mut s = String::new();
        let _ = self.write_type(&mut s, ty);
        s
    }

    pub fn path_to_string(&self, path: &Path) -> String {
        let mut s = String::new();
        let _ = self.write_path(&mut s, path);
        s
    }

    /// `[const ][async ][unsafe ][extern "abi" ]fn name<G>(params) -> Ret where ...`
    pub fn function_signature(&self, name: &str, func: &Function) -> String {
        let mut s = String::new();
        let _ = self.write_function_signature(&mut s, name, func);
        s
    }

    /// `[unsafe ]impl<G> [!]Trait<Args> for Type where ...`, or `impl<G> Type` for inherent impls.
    pub fn impl_signature(&self, imp: &Impl) -> String {
        let mut s = String::new();
        let _ = self.write_impl_signature(&mut s, imp);
        s
    }

    /// `[unsafe ][auto ]trait Name<G>: Bounds where ...`
    pub fn trait_signature(&self, name: &str, tr: &Trait) -> String {
        let mut s = String::new();
        if tr.is_unsafe {
            s.push_str("unsafe ");
        }
        if tr.is_auto {
            s.push_str("auto ");
        }
        s.push_str("trait ");
        s.push_str(name);
        let _ = self.write_generics(&mut s, &tr.generics);
        if !tr.bounds.is_empty() {
            s.push_str(": ");
            let _ = self.write_bounds(&mut s, &tr.bounds);
        }
        let _ = self.write_where_clause(&mut s, &tr.generics.where_predicates);
        s
    }

    /// `keyword Name<G> where ...` for structs, enums, unions and type aliases.
    pub fn declaration(&self, keyword: &str, name: &str, generics: &Generics) -> String {
        let mut s = format!("{} {}", keyword, name);
        let _ = self.write_generics(&mut s, generics);
        let _ = self.write_where_clause(&mut s, &generics.where_predicates);
        s
    }

    pub fn write_function_signature<W: Write>(
        &self,
        w: &mut W,
        name: &str,
        func: &Function,
    ) -> fmt::Result {
        write_header(w, &func.header)?;
        w.write_str("fn ")?;
        w.write_str(name)?;
        self.write_generics(w, &func.generics)?;

        w.write_char('(')?;
        for (i, (param_name, ty)) in func.sig.inputs.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            if param_name == "self" {
                self.write_receiver(w, ty)?;
            } else {
                write!(w, "{}: ", param_name)?;
                self.write_type(w, ty)?;
            }
        }
        if func.sig.is_c_variadic {
            if !func.sig.inputs.is_empty() {
                w.write_str(", ")?;
            }
            w.write_str("...")?;
        }
        w.write_char(')')?;

        if let Some(output) = &func.sig.output {
            w.write_str(" -> ")?;
            self.write_type(w, output)?;
        }

        self.write_where_clause(w, &func.generics.where_predicates)
    }

    fn write_receiver<W: Write>(&self, w: &mut W, ty: &Type) -> fmt::Result {
        match ty {
            Type::Generic(name) if name == "Self" => w.write_str("self"),
            Type::BorrowedRef {
                lifetime,
                is_mutable,
                type_,
            } if matches!(type_.as_ref(), Type::Generic(name) if name == "Self") => {
                w.write_char('&')?;
                if let Some(lt) = lifetime {
                    write!(w, "{} ", lt)?;
                }
                if *is_mutable {
                    w.write_str("mut ")?;
                }
                w.write_str("self")
            }
            other => {
                w.write_str("self: ")?;
                self.write_type(w, other)
            }
        }
    }

    pub fn write_impl_signature<W: Write>(&self, w: &mut W, imp: &Impl) -> fmt::Result {
        if imp.is_unsafe {
            w.write_str("unsafe ")?;
        }
        w.write_str("impl")?;
        self.write_generics(w, &imp.generics)?;
        w.write_char(' ')?;
        if let Some(trait_) = &imp.trait_ {
            if imp.is_negative {
                w.write_char('!')?;
            }
            self.write_path(w, trait_)?;
            w.write_str(" for ")?;
        }
        self.write_type(w, &imp.for_)?;
        self.write_where_clause(w, &imp.generics.where_predicates)
    }

    /// Write a type to the output buffer.
    pub fn write_type<W: Write>(&self, w: &mut W, root: &Type) -> fmt::Result {
        match root {
            Type::ResolvedPath(path) => self.write_path(w, path),
            Type::Generic(name) | Type::Primitive(name) => w.write_str(name),
            Type::BorrowedRef {
                lifetime,
                is_mutable,
                type_,
            } => {
                w.write_char('&')?;
                if let Some(lt) = lifetime {
                    write!(w, "{} ", lt)?;
                }
                if *is_mutable {
                    w.write_str("mut ")?;
                }
                self.write_type(w, type_)
            }
            Type::Tuple(types) => {
                w.write_char('(')?;
                self.write_type_list(w, types)?;
                if types.len() == 1 {
                    w.write_char(',')?;
                }
                w.write_char(')')
            }
            Type::Slice(inner) => {
                w.write_char('[')?;
                self.write_type(w, inner)?;
                w.write_char(']')
            }
            Type::Array { type_, len } => {
                w.write_char('[')?;
                self.write_type(w, type_)?;
                write!(w, "; {}]", len)
            }
            Type::RawPointer { is_mutable, type_ } => {
                w.write_str(if *is_mutable { "*mut " } else { "*const " })?;
                self.write_type(w, type_)
            }
            Type::FunctionPointer(fp) => {
                self.write_hrtb(w, &fp.generic_params)?;
                write_header(w, &fp.header)?;
                w.write_str("fn(")?;
                for (i, (_, ty)) in fp.sig.inputs.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ")?;
                    }
                    self.write_type(w, ty)?;
                }
                if fp.sig.is_c_variadic {
                    w.write_str(", ...")?;
                }
                w.write_char(')')?;
                if let Some(output) = &fp.sig.output {
                    w.write_str(" -> ")?;
                    self.write_type(w, output)?;
                }
                Ok(())
            }
            Type::QualifiedPath {
                name,
                args,
                self_type,
                trait_,
            } => {
                match trait_ {
                    Some(trait_) => {
                        w.write_char('<')?;
                        self.write_type(w, self_type)?;
                        w.write_str(" as ")?;
                        self.write_path(w, trait_)?;
                        w.write_char('>')?;
                    }
                    None => self.write_type(w, self_type)?,
                }
                write!(w, "::{}", name)?;
                if let Some(args) = args {
                    self.write_generic_args(w, args)?;
                }
                Ok(())
            }
            Type::DynTrait(dyn_trait) => {
                w.write_str("dyn ")?;
                for (i, poly) in dyn_trait.traits.iter().enumerate() {
                    if i > 0 {
                        w.write_str(" + ")?;
                    }
                    self.write_hrtb(w, &poly.generic_params)?;
                    self.write_path(w, &poly.trait_)?;
                }
                if let Some(lt) = &dyn_trait.lifetime {
                    write!(w, " + {}", lt)?;
                }
                Ok(())
            }
            Type::ImplTrait(bounds) => {
                w.write_str("impl ")?;
                self.write_bounds(w, bounds)
            }
            Type::Pat { type_, .. } => self.write_type(w, type_),
            Type::Infer => w.write_char('_'),
        }
    }

    fn write_type_list<W: Write>(&self, w: &mut W, types: &[Type]) -> fmt::Result {
        for (i, t) in types.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            self.write_type(w, t)?;
        }
        Ok(())
    }

    /// Short name of a resolved path (last segment) plus its generic args.
    pub fn write_path<W: Write>(&self, w: &mut W, path: &Path) -> fmt::Result {
        let name = self
            .tree
            .paths
            .get(&path.id)
            .and_then(|summary| summary.path.last().map(String::as_str))
            .unwrap_or_else(|| path.path.rsplit("::").next().unwrap_or(&path.path));
        w.write_str(name)?;
        match &path.args {
            Some(args) => self.write_generic_args(w, args),
            None => Ok(()),
        }
    }

    fn write_generic_args<W: Write>(&self, w: &mut W, args: &GenericArgs) -> fmt::Result {
        match args {
            GenericArgs::AngleBracketed { args, constraints } => {
                if args.is_empty() && constraints.is_empty() {
                    return Ok(());
                }
                w.write_char('<')?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ")?;
                    }
                    self.write_generic_arg(w, arg)?;
                }
                for (i, constraint) in constraints.iter().enumerate() {
                    if !args.is_empty() || i > 0 {
                        w.write_str(", ")?;
                    }
                    self.write_constraint(w, constraint)?;
                }
                w.write_char('>')
            }
            GenericArgs::Parenthesized { inputs, output } => {
                w.write_char('(')?;
                self.write_type_list(w, inputs)?;
                w.write_char(')')?;
                if let Some(out) = output {
                    w.write_str(" -> ")?;
                    self.write_type(w, out)?;
                }
                Ok(())
            }
            GenericArgs::ReturnTypeNotation => w.write_str("(..)"),
        }
    }

    fn write_generic_arg<W: Write>(&self, w: &mut W, arg: &GenericArg) -> fmt::Result {
        match arg {
            GenericArg::Lifetime(lt) => w.write_str(lt),
            GenericArg::Type(t) => self.write_type(w, t),
            GenericArg::Const(c) => w.write_str(&c.expr),
            GenericArg::Infer => w.write_char('_'),
        }
    }

    fn write_constraint<W: Write>(&self, w: &mut W, constraint: &AssocItemConstraint) -> fmt::Result {
        w.write_str(&constraint.name)?;
        match &constraint.binding {
            AssocItemConstraintKind::Equality(term) => {
                w.write_str(" = ")?;
                self.write_term(w, term)
            }
            AssocItemConstraintKind::Constraint(bounds) => {
                w.write_str(": ")?;
                self.write_bounds(w, bounds)
            }
        }
    }

    fn write_term<W: Write>(&self, w: &mut W, term: &Term) -> fmt::Result {
        match term {
            Term::Type(ty) => self.write_type(w, ty),
            Term::Constant(c) => w.write_str(&c.expr),
        }
    }

    fn write_hrtb<W: Write>(&self, w: &mut W, params: &[GenericParamDef]) -> fmt::Result {
        if params.is_empty() {
            return Ok(());
        }
        w.write_str("for<")?;
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            w.write_str(&p.name)?;
        }
        w.write_str("> ")
    }

    pub fn write_bounds<W: Write>(&self, w: &mut W, bounds: &[GenericBound]) -> fmt::Result {
        for (i, bound) in bounds.iter().enumerate() {
            if i > 0 {
                w.write_str(" + ")?;
            }
            self.write_bound(w, bound)?;
        }
        Ok(())
    }

    fn write_bound<W: Write>(&self, w: &mut W, bound: &GenericBound) -> fmt::Result {
        match bound {
            GenericBound::TraitBound {
                trait_,
                generic_params,
                modifier,
            } => {
                self.write_hrtb(w, generic_params)?;
                match modifier {
                    TraitBoundModifier::None => {}
                    TraitBoundModifier::Maybe => w.write_char('?')?,
                    TraitBoundModifier::MaybeConst => w.write_str("~const ")?,
                }
                self.write_path(w, trait_)
            }
            GenericBound::Outlives(lifetime) => w.write_str(lifetime),
            GenericBound::Use(args) => {
                w.write_str("use<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ")?;
                    }
                    match arg {
                        PreciseCapturingArg::Lifetime(name) | PreciseCapturingArg::Param(name) => {
                            w.write_str(name)?;
                        }
                    }
                }
                w.write_char('>')
            }
        }
    }

    /// Write angle-bracketed generics: `<K: Eq + Hash, V, S = RandomState>`.
    /// Synthetic params (from `impl Trait` arguments) are omitted.
    pub fn write_generics<W: Write>(&self, w: &mut W, generics: &Generics) -> fmt::Result {
        let params: Vec<_> = generics
            .params
            .iter()
            .filter(|p| {
                !matches!(
                    &p.kind,
                    GenericParamDefKind::Type {
                        is_synthetic: true,
                        ..
                    }
                )
            })
            .collect();

        if params.is_empty() {
            return Ok(());
        }

        w.write_char('<')?;
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            self.write_generic_param(w, p)?;
        }
        w.write_char('>')
    }

    fn write_generic_param<W: Write>(&self, w: &mut W, param: &GenericParamDef) -> fmt::Result {
        match &param.kind {
            GenericParamDefKind::Lifetime { outlives } => {
                w.write_str(&param.name)?;
                if !outlives.is_empty() {
                    write!(w, ": {}", outlives.join(" + "))?;
                }
                Ok(())
            }
            GenericParamDefKind::Type {
                bounds, default, ..
            } => {
                w.write_str(&param.name)?;
                if !bounds.is_empty() {
                    w.write_str(": ")?;
                    self.write_bounds(w, bounds)?;
                }
                if let Some(default) = default {
                    w.write_str(" = ")?;
                    self.write_type(w, default)?;
                }
                Ok(())
            }
            GenericParamDefKind::Const { type_, default } => {
                write!(w, "const {}: ", param.name)?;
                self.write_type(w, type_)?;
                if let Some(default) = default {
                    write!(w, " = {}", default)?;
                }
                Ok(())
            }
        }
    }

    /// Inline where clause: ` where T: Clone, U: 'a`. Writes nothing without predicates.
    pub fn write_where_clause<W: Write>(
        &self,
        w: &mut W,
        predicates: &[WherePredicate],
    ) -> fmt::Result {
        if predicates.is_empty() {
            return Ok(());
        }
        w.write_str(" where ")?;
        for (i, pred) in predicates.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            match pred {
                WherePredicate::BoundPredicate {
                    type_,
                    bounds,
                    generic_params,
                } => {
                    self.write_hrtb(w, generic_params)?;
                    self.write_type(w, type_)?;
                    w.write_str(": ")?;
                    self.write_bounds(w, bounds)?;
                }
                WherePredicate::LifetimePredicate { lifetime, outlives } => {
                    write!(w, "{}: {}", lifetime, outlives.join(" + "))?;
                }
                WherePredicate::EqPredicate { lhs, rhs } => {
                    self.write_type(w, lhs)?;
                    w.write_str(" = ")?;
                    self.write_term(w, rhs)?;
                }
            }
        }
        Ok(())
    }
}

fn write_header<W: Write>(w: &mut W, header: &FunctionHeader) -> fmt::Result {
    if header.is_const {
        w.write_str("const ")?;
    }
    if header.is_async {
        w.write_str("async ")?;
    }
    if header.is_unsafe {
        w.write_str("unsafe ")?;
    }
    if let Some(abi) = abi_name(&header.abi) {
        write!(w, "extern \"{}\" ", abi)?;
    }
    Ok(())
}

fn abi_name(abi: &Abi) -> Option<String> {
    match abi {
        Abi::Rust => None,
        Abi::C { .. } => Some("C".to_string()),
        Abi::System { .. } => Some("system".to_string()),
        Abi::Other(name) => Some(name.clone()),
        other => {
            let debug = format!("{:?}", other);
            let name = debug.split([' ', '{']).next().unwrap_or(&debug);
            Some(name.to_lowercase())
        }
    }
}

/// Collapses all whitespace runs to single spaces so macro sources render on one line.
pub fn single_line(source: &str) -> String {
    source.split_whitespace().collect::<Vec<_>>().join(" ")
}
