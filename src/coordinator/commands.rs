// MIT License - Copyright (c) 2026 Peter Wright
// Correlated requests: reset, ZDO descriptors, binding and AF data

use tracing::debug;

use crate::error::{Result, StackError};
use crate::zcl::frame;
use crate::znp::commands::{
    AfDataRequest, StatusResponse, SyncRequest, SysResetReq, ZdoActiveEpReq, ZdoBindReq, ZdoNodeDescReq,
    ZdoSimpleDescReq, ZdoUnbindReq,
};
use crate::znp::messages::{
    AfDataConfirm, AfIncomingMessage, SysResetInd, ZdoActiveEpRsp, ZdoBindRsp, ZdoNodeDescRsp, ZdoSimpleDescRsp,
    ZdoUnbindRsp,
};
use crate::znp::ResetType;

use super::{retry, Coordinator};

impl Coordinator {
    /// Soft reset the radio and wait for it to come back.
    pub async fn reset(&self) -> Result<SysResetInd> {
        let request = SysResetReq {
            reset_type: ResetType::Soft,
        };
        let (znp, request) = (&self.znp, &request);
        let ind = self
            .send_and_wait(self.config.timeouts.reset, |_: &SysResetInd| true, move || {
                znp.send_async(request)
            })
            .await?;
        debug!("Radio reset: {:?}", ind.reason);
        Ok(ind)
    }

    pub async fn active_endpoints(&self, nwk_addr: &str) -> Result<ZdoActiveEpRsp> {
        let request = ZdoActiveEpReq {
            dst_addr: nwk_addr.to_string(),
            nwk_addr_of_interest: nwk_addr.to_string(),
        };
        let addr = nwk_addr.to_string();
        let rsp = self
            .send_and_wait(
                self.config.timeouts.zdo,
                move |rsp: &ZdoActiveEpRsp| rsp.nwk_addr == addr,
                || self.send_checked(&request),
            )
            .await?;
        rsp.status.to_result()?;
        Ok(rsp)
    }

    pub async fn node_description(&self, nwk_addr: &str) -> Result<ZdoNodeDescRsp> {
        let request = ZdoNodeDescReq {
            dst_addr: nwk_addr.to_string(),
            nwk_addr_of_interest: nwk_addr.to_string(),
        };
        let addr = nwk_addr.to_string();
        let rsp = self
            .send_and_wait(
                self.config.timeouts.zdo,
                move |rsp: &ZdoNodeDescRsp| rsp.nwk_addr_of_interest == addr,
                || self.send_checked(&request),
            )
            .await?;
        rsp.status.to_result()?;
        Ok(rsp)
    }

    pub async fn simple_description(&self, nwk_addr: &str, endpoint: u8) -> Result<ZdoSimpleDescRsp> {
        let request = ZdoSimpleDescReq {
            dst_addr: nwk_addr.to_string(),
            nwk_addr_of_interest: nwk_addr.to_string(),
            endpoint,
        };
        let addr = nwk_addr.to_string();
        let rsp = self
            .send_and_wait(
                self.config.timeouts.zdo,
                move |rsp: &ZdoSimpleDescRsp| rsp.nwk_addr == addr && rsp.endpoint == endpoint,
                || self.send_checked(&request),
            )
            .await?;
        rsp.status.to_result()?;
        Ok(rsp)
    }

    /// Create a binding on the device that owns `request.dst_addr`.
    pub async fn bind(&self, request: ZdoBindReq) -> Result<()> {
        let addr = request.dst_addr.clone();
        let rsp = self
            .send_and_wait(
                self.config.timeouts.zdo,
                move |rsp: &ZdoBindRsp| rsp.src_addr == addr,
                || self.send_checked(&request),
            )
            .await?;
        rsp.status.to_result()
    }

    pub async fn unbind(&self, request: ZdoUnbindReq) -> Result<()> {
        let addr = request.dst_addr.clone();
        let rsp = self
            .send_and_wait(
                self.config.timeouts.zdo,
                move |rsp: &ZdoUnbindRsp| rsp.src_addr == addr,
                || self.send_checked(&request),
            )
            .await?;
        rsp.status.to_result()
    }

    /// Send a ZCL frame and wait for the device's answer.
    ///
    /// `request.trans_id` must equal the frame's sequence number: it is used
    /// to match both the `AfDataConfirm` and the reply frame. Retries resend
    /// the same transaction.
    pub async fn data_request(&self, request: AfDataRequest) -> Result<AfIncomingMessage> {
        let policy = self.config.timeouts.data;
        let (znp, subscriptions, request) = (&self.znp, &self.subscriptions, &request);

        retry(policy.retries, move || async move {
            let trans_id = request.trans_id;
            let dst = request.dst_addr.clone();
            let confirm = subscriptions.register::<AfDataConfirm, _>(move |c| c.trans_id == trans_id);
            let answer = subscriptions.register::<AfIncomingMessage, _>(move |m| {
                m.src_addr == dst && frame::sequence_number(&m.data) == Some(trans_id)
            });

            znp.send_sync(request).await?.status.to_result()?;

            let confirm = confirm.wait(policy.timeout).await?;
            if !confirm.status.is_success() {
                return Err(StackError::DataConfirm(confirm.status));
            }
            answer.wait(policy.timeout).await
        })
        .await
    }

    async fn send_checked<T>(&self, request: &T) -> Result<()>
    where
        T: SyncRequest<Response = StatusResponse>,
    {
        self.znp.send_sync(request).await?.status.to_result()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::tests::{quick_timeouts, setup};
    use crate::config::{RetryPolicy, StackConfig, Timeouts};
    use crate::unp::{CommandType, Subsystem};
    use crate::znp::{AddrMode, AfDataRequestOptions, Status};

    use super::*;

    fn af_request(trans_id: u8) -> AfDataRequest {
        AfDataRequest {
            dst_addr: "0x1a2b".into(),
            dst_endpoint: 1,
            src_endpoint: 1,
            cluster_id: 0x0006,
            trans_id,
            options: AfDataRequestOptions::empty(),
            radius: 15,
            data: vec![0x10, trans_id, 0x00, 0x00, 0x00],
        }
    }

    fn incoming(src: [u8; 2], tsn: u8) -> Vec<u8> {
        // group 0, cluster 6, src, src ep 1, dst ep 1, no broadcast, lqi 0x50,
        // no security, timestamp 0, seq 0, then a read attributes response
        let mut payload = vec![0x00, 0x00, 0x06, 0x00, src[0], src[1], 0x01, 0x01, 0x00, 0x50, 0x00];
        payload.extend_from_slice(&[0, 0, 0, 0, 0]);
        let zcl = [0x18, tsn, 0x01, 0x00, 0x00, 0x00, 0x10, 0x01];
        payload.push(zcl.len() as u8);
        payload.extend_from_slice(&zcl);
        payload
    }

    #[tokio::test]
    async fn test_data_request_matches_confirm_and_answer() {
        let config = StackConfig::builder().timeouts(quick_timeouts()).build();
        let (coordinator, _events, mut radio) = setup(config);

        let request = tokio::spawn({
            let coordinator = std::sync::Arc::clone(&coordinator);
            async move { coordinator.data_request(af_request(7)).await }
        });

        let sent = radio.expect(Subsystem::Af, 0x01).await;
        assert_eq!(sent.payload[6], 7);
        radio.send(CommandType::Srsp, Subsystem::Af, 0x01, &[0x00]).await;
        radio.send(CommandType::Areq, Subsystem::Af, 0x80, &[0x00, 0x01, 0x07]).await;
        // wrong source, then wrong sequence number, then the real answer
        radio.send(CommandType::Areq, Subsystem::Af, 0x81, &incoming([0x00, 0x00], 7)).await;
        radio.send(CommandType::Areq, Subsystem::Af, 0x81, &incoming([0x2b, 0x1a], 6)).await;
        radio.send(CommandType::Areq, Subsystem::Af, 0x81, &incoming([0x2b, 0x1a], 7)).await;

        let answer = request.await.unwrap().unwrap();
        assert_eq!(answer.src_addr, "0x1a2b");
        assert_eq!(frame::sequence_number(&answer.data), Some(7));
    }

    #[tokio::test]
    async fn test_data_request_retries_failed_confirm_with_same_transaction() {
        let config = StackConfig::builder().timeouts(quick_timeouts()).build();
        let (coordinator, _events, mut radio) = setup(config);

        let request = tokio::spawn({
            let coordinator = std::sync::Arc::clone(&coordinator);
            async move { coordinator.data_request(af_request(9)).await }
        });

        radio.expect(Subsystem::Af, 0x01).await;
        radio.send(CommandType::Srsp, Subsystem::Af, 0x01, &[0x00]).await;
        // MAC no ack
        radio.send(CommandType::Areq, Subsystem::Af, 0x80, &[0xe9, 0x01, 0x09]).await;

        let retried = radio.expect(Subsystem::Af, 0x01).await;
        assert_eq!(retried.payload[6], 9);
        radio.send(CommandType::Srsp, Subsystem::Af, 0x01, &[0x00]).await;
        radio.send(CommandType::Areq, Subsystem::Af, 0x80, &[0x00, 0x01, 0x09]).await;
        radio.send(CommandType::Areq, Subsystem::Af, 0x81, &incoming([0x2b, 0x1a], 9)).await;

        assert!(request.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_active_endpoints_ignores_other_devices() {
        let config = StackConfig::builder().timeouts(quick_timeouts()).build();
        let (coordinator, _events, mut radio) = setup(config);

        let request = tokio::spawn({
            let coordinator = std::sync::Arc::clone(&coordinator);
            async move { coordinator.active_endpoints("0x1a2b").await }
        });

        radio.expect(Subsystem::Zdo, 0x05).await;
        radio.send(CommandType::Srsp, Subsystem::Zdo, 0x05, &[0x00]).await;
        radio.send(CommandType::Areq, Subsystem::Zdo, 0x85, &[0x44, 0x33, 0x00, 0x44, 0x33, 0x01, 0x08]).await;
        radio.send(CommandType::Areq, Subsystem::Zdo, 0x85, &[0x2b, 0x1a, 0x00, 0x2b, 0x1a, 0x02, 0x01, 0x02]).await;

        let rsp = request.await.unwrap().unwrap();
        assert_eq!(rsp.active_ep_list, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_bind_surfaces_device_status() {
        let policy = RetryPolicy::new(Duration::from_millis(200), 0);
        let config = StackConfig::builder()
            .timeouts(Timeouts {
                zdo: policy,
                ..quick_timeouts()
            })
            .build();
        let (coordinator, _events, mut radio) = setup(config);

        let request = ZdoBindReq {
            dst_addr: "0x1a2b".into(),
            src_address: "0x00158d0001020304".into(),
            src_endpoint: 1,
            cluster_id: 0x0006,
            dst_addr_mode: AddrMode::Addr64Bit,
            dst_address: "0x00124b0001020304".into(),
            dst_endpoint: 1,
        };
        let bind = tokio::spawn({
            let coordinator = std::sync::Arc::clone(&coordinator);
            async move { coordinator.bind(request).await }
        });

        radio.expect(Subsystem::Zdo, 0x21).await;
        radio.send(CommandType::Srsp, Subsystem::Zdo, 0x21, &[0x00]).await;
        radio.send(CommandType::Areq, Subsystem::Zdo, 0xa1, &[0x2b, 0x1a, 0x8c]).await;

        let err = bind.await.unwrap().unwrap_err();
        assert!(matches!(err, StackError::Status(Status::ZdpTableFull)));
    }
}
