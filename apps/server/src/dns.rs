//! DNS responder steering radios to this server.
//!
//! Radios resolve hard-coded vendor host names. Queries for those domains
//! (and subdomains) are answered with this server's IP; queries for the
//! radio's NTP-check domain are answered with the live addresses of a public
//! NTP host. Everything else is refused.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record, RecordType};
use tokio::net::UdpSocket;

use crate::config::DnsConfig;

/// Domain the radios query to check connectivity/time.
const NTP_CHECK_DOMAIN: &str = "wifiradiofrontier.com";

/// TTL of every answer, in seconds.
const ANSWER_TTL: u32 = 300;

/// Largest datagram accepted (EDNS payloads included).
const MAX_DATAGRAM: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Zone {
    Vendor(Ipv4Addr),
    NtpCheck,
}

/// Answers DNS queries for the configured zones.
#[derive(Debug)]
pub struct DnsResponder {
    vendor_ip: Option<Ipv4Addr>,
    vendor_domains: Vec<String>,
    ntp_host: Option<String>,
}

impl DnsResponder {
    /// Creates a responder. An unparsable host IP disables the vendor
    /// domains but keeps the NTP-check domain.
    pub fn new(config: &DnsConfig) -> Self {
        let vendor_domains: Vec<String> = config
            .domains
            .iter()
            .map(|d| normalize(d))
            .filter(|d| !d.is_empty())
            .collect();

        let vendor_ip = match config.host_ip.trim().parse::<Ipv4Addr>() {
            Ok(ip) => {
                log::info!("[Dns] Registered ip '{}' for domains {:?}", ip, vendor_domains);
                Some(ip)
            }
            Err(_) => {
                log::error!(
                    "[Dns] Could not register domains {:?}: invalid host ip '{}'",
                    vendor_domains,
                    config.host_ip
                );
                None
            }
        };

        let ntp_host = Some(config.ntp_host.trim().to_string()).filter(|h| !h.is_empty());
        if let Some(host) = &ntp_host {
            log::info!(
                "[Dns] Registered ntp host '{}' for domain '{}'",
                host,
                NTP_CHECK_DOMAIN
            );
        }

        Self {
            vendor_ip,
            vendor_domains,
            ntp_host,
        }
    }

    fn zone_for(&self, name: &str) -> Option<Zone> {
        let name = normalize(name);
        if let Some(ip) = self.vendor_ip {
            if self.vendor_domains.iter().any(|d| in_domain(&name, d)) {
                return Some(Zone::Vendor(ip));
            }
        }
        if self.ntp_host.is_some() && in_domain(&name, NTP_CHECK_DOMAIN) {
            return Some(Zone::NtpCheck);
        }
        None
    }

    /// Builds the response for `request`.
    pub async fn answer(&self, request: &Message) -> Message {
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .set_authoritative(true);
        for query in request.queries() {
            response.add_query(query.clone());
        }

        let Some(query) = request.queries().first() else {
            response.set_response_code(ResponseCode::FormErr);
            return response;
        };
        let name = query.name().to_utf8();
        let Some(zone) = self.zone_for(&name) else {
            log::debug!("[Dns] Refusing query for {}", name);
            response.set_response_code(ResponseCode::Refused);
            return response;
        };

        // Only A records exist in our zones; other types get an empty answer.
        if query.query_type() != RecordType::A && query.query_type() != RecordType::ANY {
            return response;
        }

        let addresses = match zone {
            Zone::Vendor(ip) => vec![ip],
            Zone::NtpCheck => self.lookup_ntp_host().await,
        };
        log::debug!("[Dns] Answering {} with {:?}", name, addresses);
        for ip in addresses {
            response.add_answer(Record::from_rdata(
                query.name().clone(),
                ANSWER_TTL,
                RData::A(A(ip)),
            ));
        }
        response
    }

    async fn lookup_ntp_host(&self) -> Vec<Ipv4Addr> {
        let Some(host) = &self.ntp_host else {
            return Vec::new();
        };
        match tokio::net::lookup_host((host.as_str(), 0)).await {
            Ok(addrs) => {
                let mut ips: Vec<Ipv4Addr> = addrs
                    .filter_map(|addr| match addr {
                        SocketAddr::V4(v4) => Some(*v4.ip()),
                        SocketAddr::V6(_) => None,
                    })
                    .collect();
                ips.dedup();
                ips
            }
            Err(e) => {
                log::error!("[Dns] Could not lookup host '{}': {}", host, e);
                Vec::new()
            }
        }
    }
}

/// Lowercases and strips the trailing root dot.
fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// True if `name` equals `domain` or is a subdomain of it.
fn in_domain(name: &str, domain: &str) -> bool {
    name == domain
        || name
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Binds the responder's UDP socket.
pub async fn bind(config: &DnsConfig) -> Result<UdpSocket> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    UdpSocket::bind(addr)
        .await
        .with_context(|| format!("Failed to bind DNS responder to {addr}"))
}

/// Serves queries on `socket` until the task is aborted.
pub async fn run(socket: UdpSocket, responder: Arc<DnsResponder>) {
    let socket = Arc::new(socket);
    if let Ok(addr) = socket.local_addr() {
        log::info!("[Dns] Listening on udp://{}", addr);
    }

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                log::warn!("[Dns] Receive failed: {}", e);
                continue;
            }
        };
        let request = match Message::from_vec(&buf[..len]) {
            Ok(message) => message,
            Err(e) => {
                log::debug!("[Dns] Dropping undecodable packet from {}: {}", peer, e);
                continue;
            }
        };

        let socket = Arc::clone(&socket);
        let responder = Arc::clone(&responder);
        tokio::spawn(async move {
            let response = responder.answer(&request).await;
            match response.to_vec() {
                Ok(bytes) => {
                    if let Err(e) = socket.send_to(&bytes, peer).await {
                        log::warn!("[Dns] Could not reply to {}: {}", peer, e);
                    }
                }
                Err(e) => log::warn!("[Dns] Could not encode reply: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use hickory_proto::op::Query;
    use hickory_proto::rr::Name;

    use super::*;

    fn config(host_ip: &str, ntp_host: &str) -> DnsConfig {
        DnsConfig {
            enabled: true,
            host_ip: host_ip.to_string(),
            ntp_host: ntp_host.to_string(),
            ..Default::default()
        }
    }

    fn query(name: &str, record_type: RecordType) -> Message {
        let mut message = Message::new();
        message
            .set_id(4242)
            .set_recursion_desired(true)
            .add_query(Query::query(Name::from_str(name).unwrap(), record_type));
        message
    }

    fn a_records(message: &Message) -> Vec<Ipv4Addr> {
        message
            .answers()
            .iter()
            .filter_map(|r| match r.data() {
                Some(RData::A(a)) => Some(a.0),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn vendor_domains_resolve_to_host_ip() {
        let responder = DnsResponder::new(&config("192.168.1.10", ""));
        for name in ["noxonserver.eu.", "www.NoxonServer.eu.", "vtuner.com."] {
            let response = responder.answer(&query(name, RecordType::A)).await;
            assert_eq!(response.id(), 4242);
            assert_eq!(response.message_type(), MessageType::Response);
            assert_eq!(response.response_code(), ResponseCode::NoError);
            assert_eq!(a_records(&response), vec![Ipv4Addr::new(192, 168, 1, 10)]);
            assert_eq!(response.answers()[0].ttl(), 300);
        }
    }

    #[tokio::test]
    async fn other_names_are_refused() {
        let responder = DnsResponder::new(&config("192.168.1.10", ""));
        for name in ["example.org.", "notnoxonserver.eu.", "wifiradiofrontier.com."] {
            let response = responder.answer(&query(name, RecordType::A)).await;
            assert_eq!(response.response_code(), ResponseCode::Refused);
            assert!(response.answers().is_empty());
        }
    }

    #[tokio::test]
    async fn invalid_host_ip_keeps_ntp_domain() {
        let responder = DnsResponder::new(&config("not-an-ip", "127.0.0.1"));
        let vendor = responder
            .answer(&query("noxonserver.eu.", RecordType::A))
            .await;
        assert_eq!(vendor.response_code(), ResponseCode::Refused);

        let ntp = responder
            .answer(&query("time.wifiradiofrontier.com.", RecordType::A))
            .await;
        assert_eq!(ntp.response_code(), ResponseCode::NoError);
        assert_eq!(a_records(&ntp), vec![Ipv4Addr::LOCALHOST]);
    }

    #[tokio::test]
    async fn non_a_queries_get_empty_answers() {
        let responder = DnsResponder::new(&config("192.168.1.10", ""));
        let response = responder
            .answer(&query("noxonserver.eu.", RecordType::AAAA))
            .await;
        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.answers().is_empty());
    }

    #[tokio::test]
    async fn serves_over_udp() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let responder = Arc::new(DnsResponder::new(&config("10.0.0.7", "")));
        let task = tokio::spawn(run(server, responder));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        // Garbage is dropped without killing the loop.
        client.send_to(&[0xff, 0x00], server_addr).await.unwrap();
        let request = query("vtuner.com.", RecordType::A).to_vec().unwrap();
        client.send_to(&request, server_addr).await.unwrap();

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        let response = Message::from_vec(&buf[..len]).unwrap();
        assert_eq!(a_records(&response), vec![Ipv4Addr::new(10, 0, 0, 7)]);
        task.abort();
    }

    #[test]
    fn domain_matching() {
        assert!(in_domain("noxonserver.eu", "noxonserver.eu"));
        assert!(in_domain("a.b.noxonserver.eu", "noxonserver.eu"));
        assert!(!in_domain("xnoxonserver.eu", "noxonserver.eu"));
        assert!(!in_domain("noxonserver.eu.evil", "noxonserver.eu"));
    }
}
