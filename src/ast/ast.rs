//! Top-level program structure.
//!
//! A module is three name-keyed collections: representations, declarations
//! and definitions. A name may appear in at most one of them, once. Source
//! order is remembered so whole-program iteration is deterministic.

use std::{collections::HashMap, rc::Rc};

use crate::{
    errors::errors::{Error, ErrorImpl},
    Span,
};

use super::{expressions::Expr, statements::Stmt};

/// `name :: value;`
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

/// `name : type;`, defined by another module.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub ty: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionBody {
    /// A global variable. Without a value it is zero-initialized.
    Variable(Option<Expr>),
    Function(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub private: bool,
    pub ty: Option<Expr>,
    pub body: DefinitionBody,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum Item<'a> {
    Representation(&'a Representation),
    Declaration(&'a Declaration),
    Definition(&'a Definition),
}

impl<'a> Item<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Item::Representation(item) => &item.name,
            Item::Declaration(item) => &item.name,
            Item::Definition(item) => &item.name,
        }
    }

    pub fn span(&self) -> &'a Span {
        match self {
            Item::Representation(item) => &item.span,
            Item::Declaration(item) => &item.span,
            Item::Definition(item) => &item.span,
        }
    }
}

#[derive(Debug, Default)]
pub struct Module {
    pub file: Rc<String>,
    representations: HashMap<String, Representation>,
    declarations: HashMap<String, Declaration>,
    definitions: HashMap<String, Definition>,
    order: Vec<String>,
}

impl Module {
    pub fn new(file: Rc<String>) -> Self {
        Module {
            file,
            ..Default::default()
        }
    }

    fn claim(&mut self, name: &str, span: &Span) -> Result<(), Error> {
        if self.lookup(name).is_some() {
            return Err(Error::new(
                ErrorImpl::Redefinition {
                    name: name.to_string(),
                },
                span.clone(),
            ));
        }

        self.order.push(name.to_string());
        Ok(())
    }

    pub fn add_representation(&mut self, item: Representation) -> Result<(), Error> {
        self.claim(&item.name, &item.span)?;
        self.representations.insert(item.name.clone(), item);
        Ok(())
    }

    pub fn add_declaration(&mut self, item: Declaration) -> Result<(), Error> {
        self.claim(&item.name, &item.span)?;
        self.declarations.insert(item.name.clone(), item);
        Ok(())
    }

    pub fn add_definition(&mut self, item: Definition) -> Result<(), Error> {
        self.claim(&item.name, &item.span)?;
        self.definitions.insert(item.name.clone(), item);
        Ok(())
    }

    pub fn representation(&self, name: &str) -> Option<&Representation> {
        self.representations.get(name)
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Item<'_>> {
        if let Some(item) = self.representations.get(name) {
            return Some(Item::Representation(item));
        }
        if let Some(item) = self.declarations.get(name) {
            return Some(Item::Declaration(item));
        }
        self.definitions.get(name).map(Item::Definition)
    }

    /// Every item in source order.
    pub fn items(&self) -> impl Iterator<Item = Item<'_>> {
        self.order.iter().filter_map(|name| self.lookup(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
