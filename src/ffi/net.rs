//! Socket and HTTP exports.

use std::ffi::c_char;
use std::sync::Arc;

use super::{finish, finish_unit, in_cstr, in_slice, new_bytes, new_string, opt_cstr, out_param, out_slice, registry};
use crate::contract::misuse;
use crate::handles::Handle;
use crate::net::http::{HttpClient, HttpRequest, HttpResponse, HttpServer};
use crate::net::socket::{TcpConn, TcpListener, UdpConn};
use crate::status::{FatResult, Status};

/// Shared shape of the "open something at an address" exports.
unsafe fn open_at<T: crate::handles::Boxed>(
    op: &'static str,
    addr: *const c_char,
    out: *mut Handle,
    out_err: *mut Handle,
    open: impl FnOnce(&str) -> FatResult<T>,
) -> Status {
    let out = out_param(op, "out", out);
    let out_err = out_param(op, "out_err", out_err);
    let addr = in_cstr(op, "addr", addr);
    let result = open(&addr).map(|value| registry().register(value));
    finish(result, out, out_err)
}

// =============================================================================
// TCP
// =============================================================================

#[no_mangle]
pub unsafe extern "C" fn fat_tcp_dial_utf8(addr: *const c_char, out_conn: *mut Handle, out_err: *mut Handle) -> Status {
    open_at("fat_tcp_dial_utf8", addr, out_conn, out_err, TcpConn::dial)
}

#[no_mangle]
pub unsafe extern "C" fn fat_tcp_listener_listen_utf8(
    addr: *const c_char,
    out_listener: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    open_at("fat_tcp_listener_listen_utf8", addr, out_listener, out_err, TcpListener::listen)
}

/// Block until a peer connects.
#[no_mangle]
pub unsafe extern "C" fn fat_tcp_listener_accept(listener: Handle, out_conn: *mut Handle, out_err: *mut Handle) -> Status {
    const OP: &str = "fat_tcp_listener_accept";
    let out_conn = out_param(OP, "out_conn", out_conn);
    let out_err = out_param(OP, "out_err", out_err);
    let reg = registry();
    let result = reg.resolve::<TcpListener>(listener).accept().map(|c| reg.register(c));
    finish(result, out_conn, out_err)
}

#[no_mangle]
pub extern "C" fn fat_tcp_listener_addr(listener: Handle) -> Handle {
    new_string(registry().resolve::<TcpListener>(listener).addr())
}

/// Stop accepting and free the handle. A thread blocked in accept on this
/// listener returns an error.
#[no_mangle]
pub unsafe extern "C" fn fat_tcp_listener_close(listener: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_tcp_listener_close", "out_err", out_err);
    registry().release::<TcpListener>(listener).close();
    finish_unit(Ok(()), out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_tcp_conn_read(
    conn: Handle,
    dst: *mut u8,
    dst_len: usize,
    out_n: *mut usize,
    out_eof: *mut bool,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_tcp_conn_read";
    let out_n = out_param(OP, "out_n", out_n);
    let out_eof = out_param(OP, "out_eof", out_eof);
    let out_err = out_param(OP, "out_err", out_err);
    let dst = out_slice(OP, "dst", dst, dst_len);
    let status = finish(registry().resolve::<TcpConn>(conn).read(dst), out_n, out_err);
    *out_eof = status == Status::Eof;
    status
}

#[no_mangle]
pub unsafe extern "C" fn fat_tcp_conn_write(
    conn: Handle,
    src: *const u8,
    src_len: usize,
    out_n: *mut usize,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_tcp_conn_write";
    let out_n = out_param(OP, "out_n", out_n);
    let out_err = out_param(OP, "out_err", out_err);
    let src = in_slice(OP, "src", src, src_len);
    finish(registry().resolve::<TcpConn>(conn).write(src), out_n, out_err)
}

#[no_mangle]
pub extern "C" fn fat_tcp_conn_local_addr(conn: Handle) -> Handle {
    new_string(registry().resolve::<TcpConn>(conn).local_addr())
}

#[no_mangle]
pub extern "C" fn fat_tcp_conn_remote_addr(conn: Handle) -> Handle {
    new_string(registry().resolve::<TcpConn>(conn).remote_addr())
}

/// Shut the stream down and free the handle.
#[no_mangle]
pub unsafe extern "C" fn fat_tcp_conn_close(conn: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_tcp_conn_close", "out_err", out_err);
    finish_unit(registry().release::<TcpConn>(conn).close(), out_err)
}

// =============================================================================
// UDP
// =============================================================================

#[no_mangle]
pub unsafe extern "C" fn fat_udp_listen_utf8(addr: *const c_char, out_conn: *mut Handle, out_err: *mut Handle) -> Status {
    open_at("fat_udp_listen_utf8", addr, out_conn, out_err, UdpConn::listen)
}

#[no_mangle]
pub unsafe extern "C" fn fat_udp_dial_utf8(addr: *const c_char, out_conn: *mut Handle, out_err: *mut Handle) -> Status {
    open_at("fat_udp_dial_utf8", addr, out_conn, out_err, UdpConn::dial)
}

/// Receive one datagram; `out_addr` receives the sender as a new string.
#[no_mangle]
pub unsafe extern "C" fn fat_udp_conn_read_from(
    conn: Handle,
    dst: *mut u8,
    dst_len: usize,
    out_n: *mut usize,
    out_addr: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_udp_conn_read_from";
    let out_n = out_param(OP, "out_n", out_n);
    let out_addr = out_param(OP, "out_addr", out_addr);
    let out_err = out_param(OP, "out_err", out_err);
    let dst = out_slice(OP, "dst", dst, dst_len);
    let mut n = 0;
    let result = registry()
        .resolve::<UdpConn>(conn)
        .read_from(dst)
        .map(|(read, from)| {
            n = read;
            new_string(from)
        });
    let status = finish(result, out_addr, out_err);
    *out_n = n;
    status
}

#[no_mangle]
pub unsafe extern "C" fn fat_udp_conn_write_to_utf8(
    conn: Handle,
    src: *const u8,
    src_len: usize,
    addr: *const c_char,
    out_n: *mut usize,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_udp_conn_write_to_utf8";
    let out_n = out_param(OP, "out_n", out_n);
    let out_err = out_param(OP, "out_err", out_err);
    let src = in_slice(OP, "src", src, src_len);
    let addr = in_cstr(OP, "addr", addr);
    finish(registry().resolve::<UdpConn>(conn).write_to(src, &addr), out_n, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_udp_conn_write(
    conn: Handle,
    src: *const u8,
    src_len: usize,
    out_n: *mut usize,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_udp_conn_write";
    let out_n = out_param(OP, "out_n", out_n);
    let out_err = out_param(OP, "out_err", out_err);
    let src = in_slice(OP, "src", src, src_len);
    finish(registry().resolve::<UdpConn>(conn).write(src), out_n, out_err)
}

#[no_mangle]
pub extern "C" fn fat_udp_conn_local_addr(conn: Handle) -> Handle {
    new_string(registry().resolve::<UdpConn>(conn).local_addr())
}

#[no_mangle]
pub extern "C" fn fat_udp_conn_remote_addr(conn: Handle) -> Handle {
    new_string(registry().resolve::<UdpConn>(conn).remote_addr())
}

#[no_mangle]
pub unsafe extern "C" fn fat_udp_conn_close(conn: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_udp_conn_close", "out_err", out_err);
    registry().release::<UdpConn>(conn);
    finish_unit(Ok(()), out_err)
}

// =============================================================================
// HTTP client
// =============================================================================

#[no_mangle]
pub extern "C" fn fat_http_client_new() -> Handle {
    registry().register(HttpClient::new())
}

#[no_mangle]
pub extern "C" fn fat_http_client_free(client: Handle) {
    registry().release::<HttpClient>(client);
}

#[no_mangle]
pub unsafe extern "C" fn fat_http_client_get_utf8(
    client: Handle,
    url: *const c_char,
    out_resp: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_http_client_get_utf8";
    let out_resp = out_param(OP, "out_resp", out_resp);
    let out_err = out_param(OP, "out_err", out_err);
    let url = in_cstr(OP, "url", url);
    let reg = registry();
    let result = reg.resolve::<HttpClient>(client).get(&url).map(|r| reg.register(r));
    finish(result, out_resp, out_err)
}

/// POST a bytes value. A NULL `content_type` omits the header.
#[no_mangle]
pub unsafe extern "C" fn fat_http_client_post_bytes_utf8(
    client: Handle,
    url: *const c_char,
    content_type: *const c_char,
    body: Handle,
    out_resp: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_http_client_post_bytes_utf8";
    let out_resp = out_param(OP, "out_resp", out_resp);
    let out_err = out_param(OP, "out_err", out_err);
    let url = in_cstr(OP, "url", url);
    let content_type = opt_cstr(OP, "content_type", content_type);
    let reg = registry();
    let body = reg.resolve::<Vec<u8>>(body);
    let result = reg
        .resolve::<HttpClient>(client)
        .post(&url, content_type.as_deref().unwrap_or(""), &body)
        .map(|r| reg.register(r));
    finish(result, out_resp, out_err)
}

fn response(resp: Handle) -> Arc<HttpResponse> {
    registry().resolve::<HttpResponse>(resp)
}

#[no_mangle]
pub extern "C" fn fat_http_response_status(resp: Handle) -> i32 {
    response(resp).status
}

#[no_mangle]
pub extern "C" fn fat_http_response_body(resp: Handle) -> Handle {
    new_bytes(response(resp).body.as_slice())
}

/// First value of a header, or an empty string.
#[no_mangle]
pub unsafe extern "C" fn fat_http_response_header_get_utf8(resp: Handle, name: *const c_char) -> Handle {
    let name = in_cstr("fat_http_response_header_get_utf8", "name", name);
    new_string(response(resp).header(&name))
}

#[no_mangle]
pub extern "C" fn fat_http_response_free(resp: Handle) {
    registry().release::<HttpResponse>(resp);
}

// =============================================================================
// HTTP test server
// =============================================================================

fn server(s: Handle) -> Arc<HttpServer> {
    registry().resolve::<HttpServer>(s)
}

/// Start a capturing test server. `"127.0.0.1:0"` picks a free port.
#[no_mangle]
pub unsafe extern "C" fn fat_http_server_new_utf8(
    addr: *const c_char,
    out_server: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    open_at("fat_http_server_new_utf8", addr, out_server, out_err, HttpServer::bind)
}

/// Bound address as `host:port`.
#[no_mangle]
pub extern "C" fn fat_http_server_addr(s: Handle) -> Handle {
    new_string(server(s).addr().to_string())
}

/// Response sent to every later request. A NULL `content_type` omits the header.
#[no_mangle]
pub unsafe extern "C" fn fat_http_server_set_static_response(
    s: Handle,
    status: i32,
    body: Handle,
    content_type: *const c_char,
) {
    const OP: &str = "fat_http_server_set_static_response";
    let content_type = opt_cstr(OP, "content_type", content_type);
    let code = match u16::try_from(status) {
        Ok(code) if (100..=999).contains(&code) => code,
        _ => misuse(OP, format!("invalid status code {}", status)),
    };
    let body = registry().resolve::<Vec<u8>>(body);
    server(s).set_static_response(code, &body, content_type.as_deref().unwrap_or(""));
}

/// Next captured request. Negative timeout waits forever, 0 polls once.
/// Nothing arriving in time is EOF with no error.
#[no_mangle]
pub unsafe extern "C" fn fat_http_server_next_request(
    s: Handle,
    timeout_ms: i64,
    out_req: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_http_server_next_request";
    let out_req = out_param(OP, "out_req", out_req);
    let out_err = out_param(OP, "out_err", out_err);
    let server = server(s);
    let result = server.next_request(timeout_ms).map(|req| registry().register(req));
    finish(result, out_req, out_err)
}

/// Stop accepting connections and free the server handle.
#[no_mangle]
pub unsafe extern "C" fn fat_http_server_close(s: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_http_server_close", "out_err", out_err);
    finish_unit(registry().release::<HttpServer>(s).close(), out_err)
}

fn request(req: Handle) -> Arc<HttpRequest> {
    registry().resolve::<HttpRequest>(req)
}

#[no_mangle]
pub extern "C" fn fat_http_request_method(req: Handle) -> Handle {
    new_string(request(req).method.as_str())
}

/// Request path without the query string.
#[no_mangle]
pub extern "C" fn fat_http_request_path(req: Handle) -> Handle {
    new_string(request(req).path.as_str())
}

#[no_mangle]
pub extern "C" fn fat_http_request_body(req: Handle) -> Handle {
    new_bytes(request(req).body.as_slice())
}

#[no_mangle]
pub unsafe extern "C" fn fat_http_request_header_get_utf8(req: Handle, name: *const c_char) -> Handle {
    let name = in_cstr("fat_http_request_header_get_utf8", "name", name);
    new_string(request(req).headers.get_or_empty(&name))
}

#[no_mangle]
pub extern "C" fn fat_http_request_free(req: Handle) {
    registry().release::<HttpRequest>(req);
}
