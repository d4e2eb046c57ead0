//! Arithmetic toolkit.

use super::{f64_arg, FunctionSpec, Toolkit};
use crate::error::{LlmOsError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Largest n whose factorial fits in a u64.
const MAX_EXACT_FACTORIAL: u64 = 20;
/// Largest n whose factorial is a finite f64.
const MAX_FACTORIAL: u64 = 170;

/// Calculator toolkit with individually switchable operations.
#[derive(Debug, Clone, Default)]
pub struct Calculator {
    add: bool,
    subtract: bool,
    multiply: bool,
    divide: bool,
    exponentiate: bool,
    factorial: bool,
    is_prime: bool,
    square_root: bool,
}

impl Calculator {
    /// The four basic operations.
    pub fn new() -> Self {
        CalculatorBuilder::new()
            .add()
            .subtract()
            .multiply()
            .divide()
            .build()
    }

    pub fn builder() -> CalculatorBuilder {
        CalculatorBuilder::new()
    }
}

/// Selects which calculator operations are exposed.
#[derive(Debug, Clone, Default)]
pub struct CalculatorBuilder {
    calculator: Calculator,
}

impl CalculatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self) -> Self {
        self.calculator.add = true;
        self
    }

    pub fn subtract(mut self) -> Self {
        self.calculator.subtract = true;
        self
    }

    pub fn multiply(mut self) -> Self {
        self.calculator.multiply = true;
        self
    }

    pub fn divide(mut self) -> Self {
        self.calculator.divide = true;
        self
    }

    pub fn exponentiate(mut self) -> Self {
        self.calculator.exponentiate = true;
        self
    }

    pub fn factorial(mut self) -> Self {
        self.calculator.factorial = true;
        self
    }

    pub fn is_prime(mut self) -> Self {
        self.calculator.is_prime = true;
        self
    }

    pub fn square_root(mut self) -> Self {
        self.calculator.square_root = true;
        self
    }

    /// Enable every operation.
    pub fn all(self) -> Self {
        self.add()
            .subtract()
            .multiply()
            .divide()
            .exponentiate()
            .factorial()
            .is_prime()
            .square_root()
    }

    pub fn build(self) -> Calculator {
        self.calculator
    }
}

fn two_numbers(name: &str, description: &str) -> FunctionSpec {
    FunctionSpec::new(
        name,
        description,
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "number", "description": "First number"},
                "b": {"type": "number", "description": "Second number"}
            },
            "required": ["a", "b"]
        }),
    )
}

fn one_number(name: &str, description: &str, arg: &str, kind: &str) -> FunctionSpec {
    FunctionSpec::new(
        name,
        description,
        json!({
            "type": "object",
            "properties": {
                arg: {"type": kind, "description": "Input number"}
            },
            "required": [arg]
        }),
    )
}

fn result(operation: &str, value: impl Into<Value>) -> String {
    json!({"operation": operation, "result": value.into()}).to_string()
}

fn error(operation: &str, message: &str) -> String {
    json!({"operation": operation, "error": message}).to_string()
}

/// Number as JSON, integral values without a fractional part.
fn number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn check_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut i = 3;
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

fn integer_arg(args: &Value, key: &str) -> Result<i64> {
    let value = f64_arg(args, key)?;
    if value.fract() != 0.0 {
        return Err(LlmOsError::Tool(format!("'{}' must be an integer", key)));
    }
    Ok(value as i64)
}

#[async_trait]
impl Toolkit for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn functions(&self) -> Vec<FunctionSpec> {
        let mut functions = Vec::new();
        if self.add {
            functions.push(two_numbers("add", "Add two numbers and return the result."));
        }
        if self.subtract {
            functions.push(two_numbers("subtract", "Subtract the second number from the first."));
        }
        if self.multiply {
            functions.push(two_numbers("multiply", "Multiply two numbers and return the result."));
        }
        if self.divide {
            functions.push(two_numbers("divide", "Divide the first number by the second."));
        }
        if self.exponentiate {
            functions.push(two_numbers("exponentiate", "Raise the first number to the power of the second."));
        }
        if self.factorial {
            functions.push(one_number("factorial", "Calculate the factorial of a number.", "n", "integer"));
        }
        if self.is_prime {
            functions.push(one_number("is_prime", "Check if a number is prime.", "n", "integer"));
        }
        if self.square_root {
            functions.push(one_number("square_root", "Calculate the square root of a number.", "n", "number"));
        }
        functions
    }

    async fn call(&self, function: &str, args: &Value) -> Result<String> {
        debug!("Calculator {} {}", function, args);

        let output = match function {
            "add" if self.add => {
                result("addition", number(f64_arg(args, "a")? + f64_arg(args, "b")?))
            }
            "subtract" if self.subtract => {
                result("subtraction", number(f64_arg(args, "a")? - f64_arg(args, "b")?))
            }
            "multiply" if self.multiply => {
                result("multiplication", number(f64_arg(args, "a")? * f64_arg(args, "b")?))
            }
            "divide" if self.divide => {
                let (a, b) = (f64_arg(args, "a")?, f64_arg(args, "b")?);
                if b == 0.0 {
                    error("division", "Division by zero is undefined")
                } else {
                    result("division", number(a / b))
                }
            }
            "exponentiate" if self.exponentiate => {
                let (a, b) = (f64_arg(args, "a")?, f64_arg(args, "b")?);
                result("exponentiation", number(a.powf(b)))
            }
            "factorial" if self.factorial => {
                let n = integer_arg(args, "n")?;
                if n < 0 {
                    error("factorial", "Factorial of a negative number is undefined")
                } else if n as u64 <= MAX_EXACT_FACTORIAL {
                    result("factorial", (1..=n as u64).product::<u64>())
                } else if n as u64 > MAX_FACTORIAL {
                    error("factorial", "Result is too large")
                } else {
                    let approx: f64 = (1..=n).map(|i| i as f64).product();
                    result("factorial", approx)
                }
            }
            "is_prime" if self.is_prime => {
                let n = integer_arg(args, "n")?;
                result("prime_check", n > 0 && check_prime(n as u64))
            }
            "square_root" if self.square_root => {
                let n = f64_arg(args, "n")?;
                if n < 0.0 {
                    error("square_root", "Square root of a negative number is undefined")
                } else {
                    result("square_root", number(n.sqrt()))
                }
            }
            other => {
                return Err(LlmOsError::Tool(format!("Unknown calculator function: {}", other)))
            }
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn call(function: &str, args: Value) -> Value {
        let calculator = CalculatorBuilder::new().all().build();
        let output = calculator.call(function, &args).await.unwrap();
        serde_json::from_str(&output).unwrap()
    }

    #[tokio::test]
    async fn test_basic_operations() {
        assert_eq!(call("add", json!({"a": 2, "b": 3})).await["result"], 5);
        assert_eq!(call("subtract", json!({"a": 2, "b": 3})).await["result"], -1);
        assert_eq!(call("multiply", json!({"a": 2.5, "b": 2})).await["result"], 5);
        assert_eq!(call("divide", json!({"a": 7, "b": 2})).await["result"], 3.5);
        assert_eq!(call("exponentiate", json!({"a": 2, "b": 10})).await["result"], 1024);
        assert_eq!(call("add", json!({"a": 1, "b": 1})).await["operation"], "addition");
    }

    #[tokio::test]
    async fn test_undefined_results_are_reported() {
        let out = call("divide", json!({"a": 1, "b": 0})).await;
        assert_eq!(out["error"], "Division by zero is undefined");

        let out = call("factorial", json!({"n": -3})).await;
        assert!(out["error"].as_str().unwrap().contains("negative"));

        let out = call("square_root", json!({"n": -4})).await;
        assert!(out.get("result").is_none());
    }

    #[tokio::test]
    async fn test_factorial_prime_and_sqrt() {
        assert_eq!(call("factorial", json!({"n": 5})).await["result"], 120);
        assert_eq!(call("factorial", json!({"n": 0})).await["result"], 1);
        assert!(call("factorial", json!({"n": 25})).await["result"].as_f64().unwrap() > 1.0e25);
        assert!(call("factorial", json!({"n": 170})).await["result"].as_f64().unwrap() > 7.0e306);

        assert_eq!(call("is_prime", json!({"n": 97})).await["result"], true);
        assert_eq!(call("is_prime", json!({"n": 91})).await["result"], false);
        assert_eq!(call("is_prime", json!({"n": 1})).await["result"], false);

        assert_eq!(call("square_root", json!({"n": 16})).await["result"], 4);
    }

    #[tokio::test]
    async fn test_disabled_operations_are_hidden() {
        let calculator = Calculator::new();
        let names: Vec<String> = calculator.functions().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["add", "subtract", "multiply", "divide"]);

        assert!(calculator.call("factorial", &json!({"n": 3})).await.is_err());
        assert_eq!(CalculatorBuilder::new().all().build().functions().len(), 8);
    }

    #[tokio::test]
    async fn test_factorial_too_large_is_an_error() {
        for n in [json!(171), json!(1.0e12), json!(1.0e300)] {
            let out = call("factorial", json!({ "n": n })).await;
            assert_eq!(out["error"], "Result is too large");
            assert!(out.get("result").is_none());
        }
    }
}
