//! Text projections of unit values.

use crate::store::UnitStore;

/// Replace every `{name}` placeholder for a registered unit with its current
/// value. Placeholders naming unregistered units are left as written.
pub fn format_template(store: &UnitStore, template: &str) -> String {
    let mut output = template.to_owned();
    for unit in store.units() {
        let placeholder = format!("{{{}}}", unit.name);
        if output.contains(&placeholder) {
            output = output.replace(&placeholder, &unit.value.to_string());
        }
    }
    output
}

/// Zero-pad the value of each listed unit to `padding` digits and join them
/// with `separator`. Unregistered units render as a padded 0.
pub fn format_padded(store: &UnitStore, units: &[&str], separator: &str, padding: usize) -> String {
    let mut output = String::new();
    for (index, name) in units.iter().enumerate() {
        if index > 0 {
            output.push_str(separator);
        }
        let value = store.get(name).map_or(0, |unit| unit.value);
        output.push_str(&format!("{value:0padding$}"));
    }
    output
}
