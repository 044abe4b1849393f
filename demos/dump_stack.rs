use std::cell::RefCell;
use std::rc::Rc;

use stackdump::vm::{Table, UserData};
use stackdump::{config, dump_default, VMError, Value, VM};

fn main() {
    env_logger::init();
    config::init();

    let mut vm = VM::new();
    vm.push(42);
    vm.push("hello");
    vm.push(true);

    let mut point = Table::new();
    point.set("x", 1.5);
    point.set("y", -2);
    point.set("tags", Table::from_pairs([(1, "red"), (2, "blue")]));
    point.set(
        "__tostring",
        Value::function("tostring", |_, _| Ok(vec![Value::from("Point(1.5, -2)")])),
    );
    vm.push(point);

    let metatable = Rc::new(RefCell::new(Table::from_pairs([(
        "__tostring",
        Value::function("tostring", |_, _| Err(VMError::Runtime("socket closed".to_string()))),
    )])));
    vm.push(Value::userdata(UserData::with_metatable("socket", metatable)));
    vm.push(Value::LightUserData(0xdead_beef));

    dump_default(&mut vm);
    println!("stack still holds {} values", vm.top());
}
