use serde_json::{Map, Value};

use gasoline_bridge::{Level, LogPayload};
use gasoline_config::Limits;
use gasoline_serialize::{serialize, Arena, NodeId};

/// Builds the payload for one `console.{log,warn,error,info,debug}` call
/// (spec.md §4.3). `arg_roots` are the call's arguments, already staged
/// into `arena` by the host binding; each is run through the safe
/// serializer independently, so one throwing getter can't sink the
/// whole call.
pub fn build_console_payload(level: Level, arena: &Arena, arg_roots: &[NodeId], limits: &Limits) -> LogPayload {
    let args: Vec<Value> = arg_roots
        .iter()
        .map(|root| serialize(arena, *root, limits))
        .collect();

    let mut fields = Map::new();
    fields.insert("args".to_string(), Value::Array(args.clone()));

    LogPayload {
        level,
        event_type: "console".to_string(),
        message: None,
        error_message: None,
        first_serialized_arg: args.into_iter().next(),
        source: None,
        fields,
        extra_enrichments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasoline_serialize::RawValue;

    #[test]
    fn serializes_every_argument_independently() {
        let mut arena = Arena::new();
        let a = arena.insert(RawValue::String("hi".to_string()));
        let b = arena.insert(RawValue::Number(1.0));
        let payload = build_console_payload(Level::Warn, &arena, &[a, b], &Limits::default());
        assert_eq!(payload.event_type, "console");
        assert_eq!(payload.fields["args"], Value::Array(vec![Value::String("hi".to_string()), Value::Number(1.into())]));
        assert_eq!(payload.first_serialized_arg, Some(Value::String("hi".to_string())));
    }

    #[test]
    fn no_arguments_yields_empty_args_array() {
        let arena = Arena::new();
        let payload = build_console_payload(Level::Log, &arena, &[], &Limits::default());
        assert_eq!(payload.fields["args"], Value::Array(vec![]));
        assert_eq!(payload.first_serialized_arg, None);
    }
}
