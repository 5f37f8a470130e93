use crate::{Element, Error, Path, Result};
use serde_json::{Map, Value};

fn matches_select(item: &Value, key: &str, value: &Value) -> bool {
    match item {
        Value::Object(obj) => obj.get(key).map(|found| found == value).unwrap_or(false),
        _ => false,
    }
}

/// Position of the single array item matched by a select element
fn select_position(items: &[Value], key: &str, value: &Value) -> Result<usize> {
    let mut found = None;
    for (idx, item) in items.iter().enumerate() {
        if matches_select(item, key, value) {
            if found.is_some() {
                return Err(Error::SelectMatchedMultipleItems);
            }
            found = Some(idx);
        }
    }
    found.ok_or(Error::SelectMatchedNoItems)
}

fn array_position(items: &[Value], comp: &Element) -> Result<usize> {
    match comp {
        Element::Select(key, value) => select_position(items, key, value),
        Element::Index(idx) if *idx < items.len() => Ok(*idx),
        Element::Index(_) => Err(Error::OutOfBounds),
        Element::Field(_) | Element::StaticField(_) => Err(Error::NotAnObject),
    }
}

fn at(path: &Path, e: Error) -> Error {
    Error::AtPath(path.into(), Box::new(e))
}

pub trait FieldpathExt: Sized {
    fn get_comp(&self, comp: &Element) -> Result<&Self>;
    fn get_path(&self, path: &Path) -> Result<&Self>;

    fn get_comp_mut(&mut self, comp: &Element) -> Result<&mut Self>;
    fn get_path_mut(&mut self, path: &Path) -> Result<&mut Self>;

    fn remove_comp(&mut self, comp: &Element) -> Result<Option<Self>>;
    fn remove_path(&mut self, path: &Path) -> Result<Option<Self>>;

    fn set_comp(&mut self, comp: &Element, value: Self) -> Result<Option<Self>>;
    fn set_path(&mut self, path: &Path, value: Self) -> Result<Option<Self>>;

    /// Same as [`FieldpathExt::set_path`], but missing (or null) objects on the way are created
    fn insert_path(&mut self, path: &Path, value: Self) -> Result<Option<Self>>;

    fn has_path(&self, path: &Path) -> bool;
}

impl FieldpathExt for Value {
    fn get_comp(&self, comp: &Element) -> Result<&Self> {
        match (comp.field_name(), self) {
            (Some(field), Value::Object(obj)) => obj.get(field).ok_or(Error::FieldNotFound),
            (Some(_), _) => Err(Error::NotAnObject),
            (None, Value::Array(items)) => Ok(&items[array_position(items, comp)?]),
            (None, _) => Err(Error::NotAnArray),
        }
    }

    fn get_comp_mut(&mut self, comp: &Element) -> Result<&mut Self> {
        match (comp.field_name(), self) {
            (Some(field), Value::Object(obj)) => obj.get_mut(field).ok_or(Error::FieldNotFound),
            (Some(_), _) => Err(Error::NotAnObject),
            (None, Value::Array(items)) => {
                let idx = array_position(items, comp)?;
                Ok(&mut items[idx])
            }
            (None, _) => Err(Error::NotAnArray),
        }
    }

    fn get_path(&self, path: &Path) -> Result<&Self> {
        let mut found = self;
        for (idx, elem) in path.iter().enumerate() {
            found = found.get_comp(elem).map_err(|e| at(&path[..idx], e))?;
        }
        Ok(found)
    }

    fn get_path_mut(&mut self, path: &Path) -> Result<&mut Self> {
        let mut found = self;
        for (idx, elem) in path.iter().enumerate() {
            found = found.get_comp_mut(elem).map_err(|e| at(&path[..idx], e))?;
        }
        Ok(found)
    }

    fn remove_comp(&mut self, comp: &Element) -> Result<Option<Self>> {
        match (comp.field_name(), self) {
            (Some(field), Value::Object(obj)) => Ok(obj.remove(field)),
            (Some(_), _) => Err(Error::NotAnObject),
            (None, Value::Array(items)) => {
                let idx = array_position(items, comp)?;
                Ok(Some(items.remove(idx)))
            }
            (None, _) => Err(Error::NotAnArray),
        }
    }

    fn remove_path(&mut self, path: &Path) -> Result<Option<Self>> {
        let (el, parent) = path.split_last().ok_or(Error::EmptyPath)?;
        self.get_path_mut(parent)?
            .remove_comp(el)
            .map_err(|e| at(parent, e))
    }

    fn set_comp(&mut self, comp: &Element, target: Self) -> Result<Option<Self>> {
        match (comp.field_name(), self) {
            (Some(field), Value::Object(obj)) => Ok(obj.insert(field.to_owned(), target)),
            (Some(_), _) => Err(Error::NotAnObject),
            (None, Value::Array(items)) => {
                let idx = array_position(items, comp)?;
                Ok(Some(std::mem::replace(&mut items[idx], target)))
            }
            (None, _) => Err(Error::NotAnArray),
        }
    }

    fn set_path(&mut self, path: &Path, target: Self) -> Result<Option<Self>> {
        let (el, parent) = path.split_last().ok_or(Error::EmptyPath)?;
        self.get_path_mut(parent)?
            .set_comp(el, target)
            .map_err(|e| at(parent, e))
    }

    fn insert_path(&mut self, path: &Path, target: Self) -> Result<Option<Self>> {
        let (el, parent) = path.split_last().ok_or(Error::EmptyPath)?;
        let mut cur = self;
        for (idx, elem) in parent.iter().enumerate() {
            if cur.is_null() {
                *cur = Value::Object(Map::new());
            }
            cur = match (elem.field_name(), cur) {
                (Some(field), Value::Object(obj)) => obj
                    .entry(field.to_owned())
                    .or_insert_with(|| Value::Object(Map::new())),
                (_, cur) => cur.get_comp_mut(elem).map_err(|e| at(&parent[..idx], e))?,
            };
        }
        if cur.is_null() {
            *cur = Value::Object(Map::new());
        }
        cur.set_comp(el, target).map_err(|e| at(parent, e))
    }

    fn has_path(&self, path: &Path) -> bool {
        self.get_path(path).is_ok()
    }
}
