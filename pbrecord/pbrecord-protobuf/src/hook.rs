//! Extension point for many-to-many relations.

use pbrecord_core::Record;
use prost_reflect::{DynamicMessage, FieldDescriptor, Value as ProtoValue};

use crate::{coerce::push_element, converter::ConvertContext, error::ConvertError};

/// Applies a many-to-many relation in each direction.
///
/// `cx` is already one relation hop below the owning record.
pub trait ManyToManyHook: Send + Sync {
    /// Append every related record to the repeated message field, in
    /// collection order.
    fn to_message(
        &self,
        cx: &ConvertContext<'_>,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        related: &[Record],
    ) -> Result<(), ConvertError> {
        for record in related {
            let converted = cx.to_message(record)?;
            push_element(message, field, ProtoValue::Message(converted))?;
        }
        Ok(())
    }

    /// Apply an incoming repeated message value to the record. Does nothing
    /// unless overridden; writing related records is left to the caller.
    fn from_message(
        &self,
        _cx: &ConvertContext<'_>,
        _record: &mut Record,
        _name: &str,
        _field: &FieldDescriptor,
        _value: &ProtoValue,
    ) -> Result<(), ConvertError> {
        Ok(())
    }
}

/// Hook with the default behavior in both directions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultManyToMany;

impl ManyToManyHook for DefaultManyToMany {}
