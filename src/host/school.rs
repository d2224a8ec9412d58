//! A small host module exposing `Student` and `Class` objects to scripts.

use super::{expect_args, HostClass, HostModule, HostObject, HostSymbol};
use crate::interpreter::Value;

/// Seats in a class room, importable as `ROOM_CAPACITY`.
pub const ROOM_CAPACITY: i64 = 30;

#[derive(Debug)]
pub struct Student {
    name: Value,
    age: Value,
}

impl HostObject for Student {
    fn type_name(&self) -> &str {
        "Student"
    }

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(self.name.clone()),
            "age" => Some(self.age.clone()),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> bool {
        match name {
            "name" => self.name = value,
            "age" => self.age = value,
            _ => return false,
        }
        true
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, String>> {
        match name {
            "greet" => Some(expect_args(name, &args, 0).map(|_| {
                Value::String(format!(
                    "Hello, my name is {} and I am {} years old.",
                    self.name, self.age
                ))
            })),
            _ => None,
        }
    }

    fn render(&self) -> String {
        format!("Student({}, {})", self.name, self.age)
    }
}

#[derive(Debug)]
pub struct Class {
    students: Value,
    teacher: Value,
}

impl HostObject for Class {
    fn type_name(&self) -> &str {
        "Class"
    }

    fn get(&self, _name: &str) -> Option<Value> {
        None
    }

    fn set(&mut self, _name: &str, _value: Value) -> bool {
        false
    }

    fn call(&mut self, name: &str, mut args: Vec<Value>) -> Option<Result<Value, String>> {
        let result = match name {
            "getStudents" => expect_args(name, &args, 0).map(|_| self.students.clone()),
            "getTeacher" => expect_args(name, &args, 0).map(|_| self.teacher.clone()),
            "setStudents" => expect_args(name, &args, 1).map(|_| {
                self.students = args.remove(0);
                Value::Unit
            }),
            "setTeacher" => expect_args(name, &args, 1).map(|_| {
                self.teacher = args.remove(0);
                Value::Unit
            }),
            _ => return None,
        };
        Some(result)
    }
}

#[derive(Debug, Clone, Copy)]
struct StudentClass;

impl HostClass for StudentClass {
    fn name(&self) -> &str {
        "Student"
    }

    fn construct(&self, args: Vec<Value>) -> Result<Value, String> {
        expect_args(self.name(), &args, 2)?;
        let mut args = args.into_iter();
        let (name, age) = match (args.next(), args.next()) {
            (Some(name), Some(age)) => (name, age),
            _ => return Err("Student expects a name and an age".to_string()),
        };
        Ok(Value::host(Student { name, age }))
    }
}

#[derive(Debug, Clone, Copy)]
struct ClassClass;

impl HostClass for ClassClass {
    fn name(&self) -> &str {
        "Class"
    }

    fn construct(&self, args: Vec<Value>) -> Result<Value, String> {
        expect_args(self.name(), &args, 2)?;
        let mut args = args.into_iter();
        let (students, teacher) = match (args.next(), args.next()) {
            (Some(students), Some(teacher)) => (students, teacher),
            _ => return Err("Class expects students and a teacher".to_string()),
        };
        Ok(Value::host(Class { students, teacher }))
    }
}

/// The `school` module.
#[derive(Debug, Clone)]
pub struct School {
    classes: Vec<Box<dyn HostClass>>,
}

impl School {
    pub fn new() -> Self {
        School {
            classes: vec![Box::new(StudentClass), Box::new(ClassClass)],
        }
    }
}

impl Default for School {
    fn default() -> Self {
        Self::new()
    }
}

impl HostModule for School {
    fn name(&self) -> &str {
        "school"
    }

    fn resolve(&self, symbol: &str) -> Option<HostSymbol> {
        if symbol == "ROOM_CAPACITY" {
            return Some(HostSymbol::Value(Value::Int(ROOM_CAPACITY)));
        }
        self.classes
            .iter()
            .find(|class| class.name() == symbol)
            .map(|class| HostSymbol::Class(dyn_clone::clone_box(&**class)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(name: &str, age: i64) -> Value {
        StudentClass
            .construct(vec![Value::from(name), Value::Int(age)])
            .unwrap()
    }

    #[test]
    fn student_greets() {
        let value = student("Ada", 36);
        let object = match &value {
            Value::Host(object) => object.clone(),
            other => panic!("expected an object, got {:?}", other),
        };
        let greeting = object.borrow_mut().call("greet", vec![]).unwrap().unwrap();
        assert_eq!(
            greeting,
            Value::from("Hello, my name is Ada and I am 36 years old.")
        );
        assert_eq!(value.to_string(), "Student(Ada, 36)");
    }

    #[test]
    fn student_attributes() {
        let value = student("Ada", 36);
        if let Value::Host(object) = &value {
            assert!(object.borrow_mut().set("age", Value::Int(37)));
            assert!(!object.borrow_mut().set("grade", Value::Int(5)));
            assert_eq!(object.borrow().get("age"), Some(Value::Int(37)));
            assert_eq!(object.borrow().get("grade"), None);
        }
    }

    #[test]
    fn class_accessors() {
        let value = ClassClass
            .construct(vec![Value::list(vec![]), Value::from("Mr. Smith")])
            .unwrap();
        if let Value::Host(object) = &value {
            let mut class = object.borrow_mut();
            assert_eq!(
                class.call("getTeacher", vec![]),
                Some(Ok(Value::from("Mr. Smith")))
            );
            assert_eq!(
                class.call("setTeacher", vec![Value::from("Ms. Jones")]),
                Some(Ok(Value::Unit))
            );
            assert_eq!(
                class.call("getTeacher", vec![]),
                Some(Ok(Value::from("Ms. Jones")))
            );
            assert!(class.call("setTeacher", vec![]).unwrap().is_err());
            assert!(class.call("dismiss", vec![]).is_none());
        }
    }

    #[test]
    fn constructors_check_arguments() {
        assert!(StudentClass.construct(vec![Value::from("Ada")]).is_err());
        assert!(ClassClass.construct(vec![]).is_err());
    }
}
