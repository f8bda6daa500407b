//! Embedded runner program for the REPL environment
//!
//! The execution environment is hosted in a persistent interpreter child
//! process. The host and the runner exchange JSON lines over stdin/stdout:
//! the host sends `exec`, `lookup`, and `scan_final` requests; the runner
//! answers with `exec_result`, `lookup_result`, and `scan_result` events and
//! may emit `llm_query` events mid-execution, which the host answers with
//! `llm_result` before the execution continues.
//!
//! Snippet semantics implemented by the runner:
//! - import lines execute in a durable globals namespace, everything else
//!   against the combined globals+locals namespace;
//! - a trailing bare expression is evaluated and echoed as if printed, with
//!   silent fallback to plain statement execution;
//! - newly-bound non-primitive names merge into the persistent locals store
//!   after successful execution;
//! - stdout/stderr are captured per call; any raised error is caught and
//!   reported as text, never as a runner failure.

/// Python source executed with `python -u -c` to host the environment.
pub const PYTHON_RUNNER: &str = r##"
import io
import json
import sys
import time
import traceback

_HOST_STDOUT = sys.stdout


def _read_json():
    line = sys.stdin.readline()
    if not line:
        raise EOFError("stdin closed")
    return json.loads(line)


def _write_json(obj):
    _HOST_STDOUT.write(json.dumps(obj, ensure_ascii=False) + "\n")
    _HOST_STDOUT.flush()


def llm_query(prompt):
    _write_json({"type": "llm_query", "prompt": str(prompt)})
    response = _read_json()
    if response.get("type") != "llm_result":
        raise RuntimeError("invalid llm response from host")
    if response.get("ok"):
        return response.get("value", "")
    raise RuntimeError(response.get("error") or "llm_query failed")


_globals = {"llm_query": llm_query}
_locals = {}


def FINAL_VAR(variable_name):
    variable_name = str(variable_name).strip().strip('"').strip("'").strip("\n").strip("\r")
    try:
        if variable_name in _locals:
            return str(_locals[variable_name])
        return "Error: Variable '%s' not found in REPL environment" % variable_name
    except Exception as e:
        return "Error retrieving variable '%s': %s" % (variable_name, str(e))


_globals["FINAL_VAR"] = FINAL_VAR

_STATEMENT_PREFIXES = (
    "import ", "from ", "def ", "class ", "if ", "for ", "while ",
    "try:", "with ", "return ", "yield ", "break", "continue", "pass",
)


def _is_bare_expression(line):
    stripped = line.strip()
    if stripped.startswith(_STATEMENT_PREFIXES):
        return False
    if "=" in line.split("#")[0]:
        return False
    if stripped.endswith(":"):
        return False
    if stripped.startswith("print("):
        return False
    return True


def _snapshot():
    variables = {}
    for key, value in _locals.items():
        if key.startswith("_"):
            continue
        try:
            preview = repr(value)
        except Exception:
            preview = "<unrepresentable>"
        if len(preview) > 200:
            preview = preview[:200] + "..."
        try:
            length = len(value) if hasattr(value, "__len__") else None
        except Exception:
            length = None
        variables[key] = {
            "type": type(value).__name__,
            "length": length,
            "preview": preview,
        }
    return variables


def _execute(code):
    start = time.time()
    stdout_buffer = io.StringIO()
    stderr_buffer = io.StringIO()
    old_stdout = sys.stdout
    old_stderr = sys.stderr
    sys.stdout = stdout_buffer
    sys.stderr = stderr_buffer
    try:
        try:
            import_lines = []
            other_lines = []
            for line in code.split("\n"):
                stripped = line.strip()
                if stripped.startswith(("import ", "from ")) and not stripped.startswith("#"):
                    import_lines.append(line)
                else:
                    other_lines.append(line)

            if import_lines:
                exec("\n".join(import_lines), _globals, _globals)

            if other_lines:
                other_code = "\n".join(other_lines)
                namespace = dict(_globals)
                namespace.update(_locals)

                non_comment = [
                    line for line in other_lines
                    if line.strip() and not line.strip().startswith("#")
                ]

                if non_comment and _is_bare_expression(non_comment[-1]):
                    last_line = non_comment[-1]
                    try:
                        if len(non_comment) > 1:
                            last_index = -1
                            for i, line in enumerate(other_lines):
                                if line.strip() == last_line.strip():
                                    last_index = i
                                    break
                            if last_index > 0:
                                exec("\n".join(other_lines[:last_index]), namespace, namespace)
                        result = eval(last_line, namespace, namespace)
                        if result is not None:
                            print(repr(result))
                    except Exception:
                        exec(other_code, namespace, namespace)
                else:
                    exec(other_code, namespace, namespace)

                for key, value in namespace.items():
                    if key not in _globals:
                        _locals[key] = value

            stdout_content = stdout_buffer.getvalue()
            stderr_content = stderr_buffer.getvalue()
        except Exception as e:
            print("REPL execution error: %s" % str(e))
            traceback.print_exc()
            stdout_content = stdout_buffer.getvalue()
            stderr_content = stderr_buffer.getvalue() + str(e)
    finally:
        sys.stdout = old_stdout
        sys.stderr = old_stderr

    _locals["_stdout"] = stdout_content
    _locals["_stderr"] = stderr_content

    return {
        "type": "exec_result",
        "stdout": stdout_content,
        "stderr": stderr_content,
        "variables": _snapshot(),
        "duration_ms": (time.time() - start) * 1000.0,
    }


init = _read_json()
if init.get("type") != "init":
    raise RuntimeError("first message must be init")

while True:
    try:
        request = _read_json()
    except EOFError:
        break

    kind = request.get("type")
    if kind == "exec":
        _write_json(_execute(request.get("code", "")))
    elif kind == "lookup":
        name = str(request.get("name", ""))
        if name in _locals:
            _write_json({"type": "lookup_result", "found": True, "value": str(_locals[name])})
        else:
            _write_json({"type": "lookup_result", "found": False, "value": None})
    elif kind == "scan_final":
        answer = None
        for value in _locals.values():
            if isinstance(value, str) and value.startswith("FINAL(") and value.endswith(")"):
                answer = value[6:-1]
                break
        _write_json({"type": "scan_result", "answer": answer})
    else:
        _write_json({"type": "error", "error": "invalid request type"})
"##;
